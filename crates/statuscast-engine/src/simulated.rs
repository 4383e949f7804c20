//! In-process player model with no external dependency.

use std::path::Path;
use std::time::Duration;

use statuscast_core::error::EngineError;
use statuscast_core::models::{PlaybackState, PlaybackStatus, UNKNOWN_MS};
use statuscast_core::traits::{MediaEngine, SeekTarget, StatusSource};
use tokio::time::Instant;
use tracing::debug;

use crate::loading::LoadingTracker;
use crate::media::filename_from_uri;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Stopped,
    Paused,
    Playing { since: Instant },
}

#[derive(Debug, Clone)]
struct Loaded {
    title: String,
    filename: String,
    /// When the media becomes ready; `None` never finishes loading.
    ready_at: Option<Instant>,
}

/// A player that behaves like a real one: opening takes a while, playback
/// advances with the clock, and the media ends on its own.
#[derive(Debug)]
pub struct SimulatedEngine {
    load_delay: Option<Duration>,
    duration_ms: i64,
    media: Option<Loaded>,
    transport: Transport,
    /// Position at the last transport change.
    position_ms: i64,
    loading: LoadingTracker,
    reachable: bool,
}

impl SimulatedEngine {
    /// `load_delay` of `None` models a file that never finishes opening.
    pub fn new(load_delay: Option<Duration>, duration: Duration, loading: LoadingTracker) -> Self {
        Self {
            load_delay,
            duration_ms: i64::try_from(duration.as_millis()).unwrap_or(i64::MAX),
            media: None,
            transport: Transport::Stopped,
            position_ms: 0,
            loading,
            reachable: true,
        }
    }

    /// Make every query and command fail as if the player went away.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    fn ensure_reachable(&self) -> Result<(), EngineError> {
        if self.reachable {
            Ok(())
        } else {
            Err(EngineError::Unavailable("simulated engine is offline".into()))
        }
    }

    fn ready_since(&self, now: Instant) -> Option<Instant> {
        let ready_at = self.media.as_ref()?.ready_at?;
        (now >= ready_at).then_some(ready_at)
    }

    /// Position at `now`, applying natural end of media.
    fn settle(&mut self, now: Instant) -> i64 {
        let Transport::Playing { since } = self.transport else {
            return self.position_ms;
        };
        let Some(ready_at) = self.ready_since(now) else {
            return self.position_ms;
        };
        let counted_from = since.max(ready_at);
        let elapsed = i64::try_from(now.duration_since(counted_from).as_millis()).unwrap_or(i64::MAX);
        let position = self.position_ms.saturating_add(elapsed);

        if position >= self.duration_ms {
            debug!("Simulated media reached its end");
            self.transport = Transport::Stopped;
            self.position_ms = 0;
            return 0;
        }
        position
    }

    /// Freeze the current position so the transport can change.
    fn fold_position(&mut self, now: Instant) {
        self.position_ms = self.settle(now);
        if let Transport::Playing { .. } = self.transport {
            self.transport = Transport::Playing { since: now };
        }
    }

    fn require_media(&self) -> Result<(), EngineError> {
        if self.media.is_some() {
            Ok(())
        } else {
            Err(EngineError::Command("no media loaded".into()))
        }
    }

    fn snapshot(&mut self, now: Instant) -> PlaybackStatus {
        if self.media.is_none() {
            return PlaybackStatus::no_media();
        }

        let position_ms = self.settle(now);
        let ready = self.ready_since(now).is_some();
        let (raw, duration_ms) = if !ready {
            (PlaybackState::Loading, UNKNOWN_MS)
        } else {
            let raw = match self.transport {
                Transport::Playing { .. } => PlaybackState::Playing,
                Transport::Paused => PlaybackState::Paused,
                Transport::Stopped => PlaybackState::Stopped,
            };
            (raw, self.duration_ms)
        };

        let (state, is_loading) = self.loading.observe(raw, position_ms, duration_ms, now);
        let Some(media) = self.media.as_ref() else {
            return PlaybackStatus::no_media();
        };
        PlaybackStatus {
            state,
            position_ms,
            duration_ms,
            title: media.title.clone(),
            filename: media.filename.clone(),
            is_loading,
        }
    }
}

impl StatusSource for SimulatedEngine {
    async fn query_status(&mut self) -> Result<PlaybackStatus, EngineError> {
        self.ensure_reachable()?;
        Ok(self.snapshot(Instant::now()))
    }
}

impl MediaEngine for SimulatedEngine {
    async fn open(&mut self, path: &str) -> Result<(), EngineError> {
        self.ensure_reachable()?;
        let now = Instant::now();
        let filename = filename_from_uri(path);
        let title = Path::new(&filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(%filename, "Simulated open");

        self.media = Some(Loaded {
            title,
            filename,
            ready_at: self.load_delay.map(|delay| now + delay),
        });
        self.transport = Transport::Paused;
        self.position_ms = 0;
        self.loading.begin(now);
        Ok(())
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        self.ensure_reachable()?;
        self.require_media()?;
        if !matches!(self.transport, Transport::Playing { .. }) {
            self.transport = Transport::Playing {
                since: Instant::now(),
            };
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        self.ensure_reachable()?;
        self.require_media()?;
        self.fold_position(Instant::now());
        if let Transport::Playing { .. } = self.transport {
            self.transport = Transport::Paused;
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.ensure_reachable()?;
        self.transport = Transport::Stopped;
        self.position_ms = 0;
        self.loading.cancel();
        Ok(())
    }

    async fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
        self.ensure_reachable()?;
        self.require_media()?;
        let now = Instant::now();
        if self.ready_since(now).is_none() {
            return Err(EngineError::Command("media is still loading".into()));
        }
        self.fold_position(now);
        let target_ms = i64::try_from(target.resolve(self.position_ms)).unwrap_or(i64::MAX);
        self.position_ms = target_ms.min(self.duration_ms);
        Ok(())
    }
}
