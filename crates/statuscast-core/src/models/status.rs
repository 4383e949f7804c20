use serde::{Deserialize, Serialize};

/// Sentinel for a position or duration the engine could not report.
pub const UNKNOWN_MS: i64 = -1;

/// Title/filename reported when no media is loaded.
pub const NO_MEDIA: &str = "No media";

/// Coarse classification of what the engine is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
    Loading,
    /// The engine could not be classified (unreachable or mid-transition).
    Unknown,
}

impl PlaybackState {
    pub const ALL: &[PlaybackState] = &[
        Self::Playing,
        Self::Paused,
        Self::Stopped,
        Self::Loading,
        Self::Unknown,
    ];

    /// Name used on the wire and in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
            Self::Loading => "Loading",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse the wire name back (exact, case-sensitive).
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|state| state.as_str() == s)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of the engine's playback state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Current position in milliseconds, or [`UNKNOWN_MS`].
    pub position_ms: i64,
    /// Media length in milliseconds, or [`UNKNOWN_MS`]. Zero means "no seekable length".
    pub duration_ms: i64,
    pub title: String,
    pub filename: String,
    /// A file-open is in flight and no position progress has been observed yet.
    pub is_loading: bool,
}

impl PlaybackStatus {
    /// The canonical "not playing" status, also substituted when a query fails.
    pub fn no_media() -> Self {
        Self {
            state: PlaybackState::Stopped,
            position_ms: 0,
            duration_ms: 0,
            title: NO_MEDIA.into(),
            filename: NO_MEDIA.into(),
            is_loading: false,
        }
    }

    /// Status for an engine that is reachable but knows nothing about timing.
    pub fn unknown() -> Self {
        Self {
            state: PlaybackState::Unknown,
            position_ms: UNKNOWN_MS,
            duration_ms: UNKNOWN_MS,
            title: String::new(),
            filename: String::new(),
            is_loading: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == PlaybackState::Stopped
    }

    /// Position as a known value, `None` for the sentinel.
    pub fn position(&self) -> Option<u64> {
        u64::try_from(self.position_ms).ok()
    }

    /// Duration as a known value, `None` for the sentinel.
    pub fn duration(&self) -> Option<u64> {
        u64::try_from(self.duration_ms).ok()
    }

    /// Whether something is actually loaded, as opposed to the "No media" sentinel.
    pub fn has_media(&self) -> bool {
        (self.duration_ms > 0 || !self.filename.is_empty()) && self.filename != NO_MEDIA
    }

    /// Playback progress in percent, when both position and a positive duration are known.
    pub fn progress_percent(&self) -> Option<f64> {
        match (self.position(), self.duration()) {
            (Some(pos), Some(dur)) if dur > 0 => Some(pos as f64 / dur as f64 * 100.0),
            _ => None,
        }
    }
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self::no_media()
    }
}
