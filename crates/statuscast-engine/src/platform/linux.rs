use std::time::Duration;

use mpris::{FindingError, Player, PlayerFinder};
use statuscast_core::error::EngineError;
use statuscast_core::models::{PlaybackState, PlaybackStatus, UNKNOWN_MS};
use statuscast_core::traits::{MediaEngine, SeekTarget, StatusSource};
use tokio::time::Instant;
use tracing::debug;

use crate::loading::LoadingTracker;
use crate::media::filename_from_uri;
use crate::platform::no_player;

/// The active MPRIS player on the D-Bus session bus.
///
/// D-Bus handles are not `Send`, so a fresh connection is made per call
/// and never held across an await point.
pub struct MprisEngine {
    /// Restrict to players whose identity contains this (case-insensitive).
    identity: Option<String>,
    loading: LoadingTracker,
}

fn dbus_error(e: impl std::fmt::Display) -> EngineError {
    EngineError::Unavailable(format!("D-Bus: {e}"))
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

impl MprisEngine {
    /// Fails when there is no D-Bus session bus to talk to.
    pub fn connect(identity: Option<String>, loading: LoadingTracker) -> Result<Self, EngineError> {
        PlayerFinder::new().map_err(dbus_error)?;
        Ok(Self { identity, loading })
    }

    fn find_player(&self) -> Result<Player, EngineError> {
        let finder = PlayerFinder::new().map_err(dbus_error)?;
        let player = match &self.identity {
            Some(wanted) => {
                let wanted = wanted.to_lowercase();
                finder
                    .find_all()
                    .map_err(dbus_error)?
                    .into_iter()
                    .find(|p| p.identity().to_lowercase().contains(&wanted))
                    .ok_or_else(|| no_player(&format!("MPRIS player matching {wanted:?}")))?
            }
            None => finder.find_active().map_err(|e| match e {
                FindingError::NoPlayerFound => no_player("active MPRIS player"),
                other => dbus_error(other),
            })?,
        };
        Ok(player)
    }

    fn read_status(&mut self, now: Instant) -> Result<PlaybackStatus, EngineError> {
        let player = self.find_player()?;
        let raw_state = match player.get_playback_status().map_err(dbus_error)? {
            mpris::PlaybackStatus::Playing => PlaybackState::Playing,
            mpris::PlaybackStatus::Paused => PlaybackState::Paused,
            mpris::PlaybackStatus::Stopped => PlaybackState::Stopped,
        };
        let metadata = player.get_metadata().map_err(dbus_error)?;
        let position_ms = player
            .get_position()
            .map(duration_ms)
            .unwrap_or(UNKNOWN_MS);
        let duration = metadata.length().map(duration_ms).unwrap_or(UNKNOWN_MS);
        let title = metadata.title().unwrap_or_default().to_string();
        let filename = metadata.url().map(filename_from_uri).unwrap_or_default();

        debug!(player = %player.identity(), title = %title, "Read MPRIS player");

        let (state, is_loading) = self.loading.observe(raw_state, position_ms, duration, now);
        Ok(PlaybackStatus {
            state,
            position_ms,
            duration_ms: duration,
            title,
            filename,
            is_loading,
        })
    }

    fn control(&self, action: impl FnOnce(&Player) -> Result<(), mpris::DBusError>) -> Result<(), EngineError> {
        let player = self.find_player()?;
        action(&player).map_err(|e| EngineError::Command(e.to_string()))
    }

    fn seek_to(&self, target: SeekTarget) -> Result<(), EngineError> {
        let player = self.find_player()?;
        let current_ms = player
            .get_position()
            .map(duration_ms)
            .unwrap_or(UNKNOWN_MS);
        let target_ms = i64::try_from(target.resolve(current_ms)).unwrap_or(i64::MAX);
        let offset_us = (target_ms - current_ms.max(0)).saturating_mul(1000);
        player
            .seek(offset_us)
            .map_err(|e| EngineError::Command(e.to_string()))
    }
}

impl StatusSource for MprisEngine {
    async fn query_status(&mut self) -> Result<PlaybackStatus, EngineError> {
        self.read_status(Instant::now())
    }
}

impl MediaEngine for MprisEngine {
    async fn open(&mut self, _path: &str) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("open"))
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        self.control(Player::play)
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        self.control(Player::pause)
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.control(Player::stop)?;
        self.loading.cancel();
        Ok(())
    }

    async fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
        self.seek_to(target)
    }
}
