use std::time::Duration;

use statuscast_core::models::PlaybackState;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default upper bound on how long a file-open may stay "loading".
pub const DEFAULT_LOADING_TIMEOUT: Duration = Duration::from_millis(45_000);

/// Tracks whether a file-open is still in flight.
///
/// Loading starts when a file is opened (or the engine reports a transitional
/// state on its own) and ends once playback makes progress, playback stops,
/// or the timeout passes. A timed-out load is not restarted until the engine
/// leaves its transitional state.
#[derive(Debug, Clone)]
pub struct LoadingTracker {
    timeout: Duration,
    started: Option<Instant>,
    expired: bool,
}

impl LoadingTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            started: None,
            expired: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_loading(&self) -> bool {
        self.started.is_some()
    }

    /// A file was just opened.
    pub fn begin(&mut self, now: Instant) {
        self.started = Some(now);
        self.expired = false;
    }

    pub fn cancel(&mut self) {
        self.started = None;
    }

    /// Fold one raw engine observation into the tracker.
    ///
    /// Returns the state to report and the `is_loading` flag.
    pub fn observe(
        &mut self,
        raw: PlaybackState,
        position_ms: i64,
        duration_ms: i64,
        now: Instant,
    ) -> (PlaybackState, bool) {
        if raw != PlaybackState::Loading {
            self.expired = false;
        } else if self.started.is_none() && !self.expired {
            debug!("Engine reports a transitional state, tracking load");
            self.started = Some(now);
        }

        if let Some(started) = self.started {
            if raw == PlaybackState::Playing && position_ms > 0 {
                debug!(position_ms, "Load finished, playback progressing");
                self.started = None;
            } else if raw == PlaybackState::Stopped {
                debug!("Load ended, engine stopped");
                self.started = None;
            } else if now.duration_since(started) > self.timeout {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Load made no progress within timeout, giving up"
                );
                self.started = None;
                self.expired = raw == PlaybackState::Loading;
            }
        }

        let state = if raw == PlaybackState::Loading && self.expired {
            if duration_ms > 0 {
                PlaybackState::Paused
            } else {
                PlaybackState::Stopped
            }
        } else {
            raw
        };

        (state, self.started.is_some())
    }
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LOADING_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_progress_clears_loading() {
        let mut tracker = LoadingTracker::default();
        tracker.begin(Instant::now());

        let (state, loading) = tracker.observe(PlaybackState::Playing, 0, 60_000, Instant::now());
        assert_eq!(state, PlaybackState::Playing);
        assert!(loading);

        tokio::time::advance(Duration::from_millis(300)).await;
        let (state, loading) =
            tracker.observe(PlaybackState::Playing, 300, 60_000, Instant::now());
        assert_eq!(state, PlaybackState::Playing);
        assert!(!loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_while_loading_keeps_state() {
        let mut tracker = LoadingTracker::default();
        tracker.begin(Instant::now());
        let (state, loading) = tracker.observe(PlaybackState::Paused, 0, 60_000, Instant::now());
        assert_eq!(state, PlaybackState::Paused);
        assert!(loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_clears_loading() {
        let mut tracker = LoadingTracker::default();
        tracker.begin(Instant::now());
        let (_, loading) = tracker.observe(PlaybackState::Stopped, 0, 0, Instant::now());
        assert!(!loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_progress() {
        let mut tracker = LoadingTracker::new(Duration::from_millis(45_000));
        tracker.begin(Instant::now());

        tokio::time::advance(Duration::from_millis(45_000)).await;
        let (_, loading) = tracker.observe(PlaybackState::Paused, 0, 60_000, Instant::now());
        assert!(loading, "exactly at the timeout is still loading");

        tokio::time::advance(Duration::from_millis(1)).await;
        let (state, loading) = tracker.observe(PlaybackState::Paused, 0, 60_000, Instant::now());
        assert_eq!(state, PlaybackState::Paused);
        assert!(!loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_transitional_state_resolves() {
        let mut tracker = LoadingTracker::new(Duration::from_secs(45));

        let (state, loading) = tracker.observe(PlaybackState::Loading, 0, -1, Instant::now());
        assert_eq!(state, PlaybackState::Loading);
        assert!(loading);

        tokio::time::advance(Duration::from_secs(46)).await;
        let (state, loading) = tracker.observe(PlaybackState::Loading, 0, -1, Instant::now());
        assert_eq!(state, PlaybackState::Stopped);
        assert!(!loading);

        // Stays resolved while the engine keeps reporting the same thing.
        tokio::time::advance(Duration::from_secs(60)).await;
        let (state, loading) = tracker.observe(PlaybackState::Loading, 0, 120_000, Instant::now());
        assert_eq!(state, PlaybackState::Paused);
        assert!(!loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_open_rearms_after_expiry() {
        let mut tracker = LoadingTracker::new(Duration::from_secs(1));
        tracker.observe(PlaybackState::Loading, 0, 0, Instant::now());
        tokio::time::advance(Duration::from_secs(2)).await;
        tracker.observe(PlaybackState::Loading, 0, 0, Instant::now());

        tracker.begin(Instant::now());
        let (state, loading) = tracker.observe(PlaybackState::Loading, 0, 0, Instant::now());
        assert_eq!(state, PlaybackState::Loading);
        assert!(loading);
    }
}
