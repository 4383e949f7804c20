use statuscast_core::error::EngineError;
use statuscast_core::models::{PlaybackState, PlaybackStatus, UNKNOWN_MS};
use statuscast_core::traits::{MediaEngine, SeekTarget, StatusSource};
use tokio::time::Instant;
use tracing::debug;
use windows::Media::Control::{
    GlobalSystemMediaTransportControlsSession, GlobalSystemMediaTransportControlsSessionManager,
    GlobalSystemMediaTransportControlsSessionPlaybackStatus as SmtcStatus,
};

use crate::loading::LoadingTracker;
use crate::platform::no_player;

/// 100 ns ticks per millisecond.
const TICKS_PER_MS: i64 = 10_000;

/// The current session of Windows System Media Transport Controls.
pub struct SmtcEngine {
    manager: GlobalSystemMediaTransportControlsSessionManager,
    loading: LoadingTracker,
}

fn smtc_error(e: windows::core::Error) -> EngineError {
    EngineError::Unavailable(format!("SMTC: {e}"))
}

impl SmtcEngine {
    /// Fails when the session manager cannot be obtained.
    pub fn connect(loading: LoadingTracker) -> Result<Self, EngineError> {
        let manager = GlobalSystemMediaTransportControlsSessionManager::RequestAsync()
            .and_then(|op| op.get())
            .map_err(smtc_error)?;
        Ok(Self { manager, loading })
    }

    fn session(&self) -> Result<GlobalSystemMediaTransportControlsSession, EngineError> {
        self.manager
            .GetCurrentSession()
            .map_err(|_| no_player("current SMTC session"))
    }

    fn read_status(&mut self, now: Instant) -> Result<PlaybackStatus, EngineError> {
        let session = self.session()?;

        let raw_state = match session
            .GetPlaybackInfo()
            .and_then(|info| info.PlaybackStatus())
            .map_err(smtc_error)?
        {
            SmtcStatus::Playing => PlaybackState::Playing,
            SmtcStatus::Paused => PlaybackState::Paused,
            SmtcStatus::Stopped | SmtcStatus::Closed => PlaybackState::Stopped,
            SmtcStatus::Changing | SmtcStatus::Opened => PlaybackState::Loading,
            _ => PlaybackState::Unknown,
        };

        let (position_ms, duration_ms) = match session.GetTimelineProperties() {
            Ok(timeline) => {
                let start = timeline.StartTime().map(|t| t.Duration).unwrap_or(0);
                let position = timeline
                    .Position()
                    .map(|t| (t.Duration - start) / TICKS_PER_MS)
                    .unwrap_or(UNKNOWN_MS);
                let duration = timeline
                    .EndTime()
                    .map(|t| (t.Duration - start) / TICKS_PER_MS)
                    .unwrap_or(UNKNOWN_MS);
                (position, duration)
            }
            Err(_) => (UNKNOWN_MS, UNKNOWN_MS),
        };

        let title = session
            .TryGetMediaPropertiesAsync()
            .and_then(|op| op.get())
            .and_then(|props| props.Title())
            .map(|t| t.to_string())
            .unwrap_or_default();

        let app_id = session
            .SourceAppUserModelId()
            .map(|id| id.to_string())
            .unwrap_or_default();
        debug!(player = %app_id_to_display_name(&app_id), title = %title, "Read SMTC session");

        let (state, is_loading) = self.loading.observe(raw_state, position_ms, duration_ms, now);
        Ok(PlaybackStatus {
            state,
            position_ms,
            duration_ms,
            // SMTC exposes no file path; the title is the closest thing.
            filename: title.clone(),
            title,
            is_loading,
        })
    }

    fn accepted(result: windows::core::Result<bool>, what: &str) -> Result<(), EngineError> {
        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(EngineError::Command(format!("player refused {what}"))),
            Err(e) => Err(EngineError::Command(format!("{what}: {e}"))),
        }
    }
}

impl StatusSource for SmtcEngine {
    async fn query_status(&mut self) -> Result<PlaybackStatus, EngineError> {
        self.read_status(Instant::now())
    }
}

impl MediaEngine for SmtcEngine {
    async fn open(&mut self, _path: &str) -> Result<(), EngineError> {
        Err(EngineError::Unsupported("open"))
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        let session = self.session()?;
        Self::accepted(session.TryPlayAsync().and_then(|op| op.get()), "play")
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        let session = self.session()?;
        Self::accepted(session.TryPauseAsync().and_then(|op| op.get()), "pause")
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        let session = self.session()?;
        Self::accepted(session.TryStopAsync().and_then(|op| op.get()), "stop")?;
        self.loading.cancel();
        Ok(())
    }

    async fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
        let current_ms = self.read_status(Instant::now())?.position_ms;
        let session = self.session()?;
        let ticks = i64::try_from(target.resolve(current_ms))
            .unwrap_or(i64::MAX / TICKS_PER_MS)
            .saturating_mul(TICKS_PER_MS);
        Self::accepted(
            session
                .TryChangePlaybackPositionAsync(ticks)
                .and_then(|op| op.get()),
            "seek",
        )
    }
}

/// Convert an SMTC app user model ID into a human-readable display name.
///
/// Strips `.exe` suffixes, package family name suffixes (after `_`),
/// and path components.
fn app_id_to_display_name(app_id: &str) -> String {
    let mut name = app_id.rsplit('\\').next().unwrap_or(app_id);
    name = name.strip_suffix(".exe").unwrap_or(name);

    // UWP package hash, e.g. "App_8wekyb3d8bbwe".
    if let Some((head, hash)) = name.rsplit_once('_') {
        if hash.len() >= 8 && hash.chars().all(|c| c.is_ascii_alphanumeric()) {
            name = head;
        }
    }
    name.to_string()
}
