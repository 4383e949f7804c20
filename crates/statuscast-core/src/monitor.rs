//! The status polling-and-broadcast loop body.
//!
//! An external scheduler calls [`StatusMonitor::tick`] as often as it likes;
//! the monitor admits at most one query per update interval, and every
//! admitted tick produces exactly one message on the wire, changed or not.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::BroadcastConfig;
use crate::models::PlaybackStatus;
use crate::traits::{MessageSink, StatusSource};
use crate::wire::{BroadcastMessage, WireFormat, DEFAULT_SERVER_ID};

/// Position drift below this is jitter, not a change event.
pub const POSITION_TOLERANCE_MS: u64 = 2000;

/// Recommended cadence: 5 Hz.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 200;

/// Result of one scheduler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not due yet. Nothing was queried or sent.
    Skipped,
    /// Real engine status was broadcast.
    Broadcast(BroadcastMessage),
    /// The engine query failed; a synthetic stopped status was broadcast instead.
    Degraded(BroadcastMessage),
}

impl TickOutcome {
    pub fn message(&self) -> Option<&BroadcastMessage> {
        match self {
            Self::Skipped => None,
            Self::Broadcast(msg) | Self::Degraded(msg) => Some(msg),
        }
    }

    pub fn is_admitted(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

/// Loop parameters.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub update_interval_ms: u64,
    pub server_id: String,
    pub format: WireFormat,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            server_id: DEFAULT_SERVER_ID.into(),
            format: WireFormat::Rich,
        }
    }
}

impl From<&BroadcastConfig> for MonitorSettings {
    fn from(cfg: &BroadcastConfig) -> Self {
        Self {
            update_interval_ms: cfg.interval_ms,
            server_id: cfg.server_id.clone(),
            format: cfg.format,
        }
    }
}

/// The loop's private memory.
#[derive(Debug, Default)]
struct MonitorState {
    last_observed: Option<PlaybackStatus>,
    last_poll: Option<DateTime<Utc>>,
    last_query: Option<DateTime<Utc>>,
    last_changed: bool,
}

/// Whether `current` differs meaningfully from `previous`.
///
/// All fields compare exactly except the position, which only counts when it
/// moved by more than [`POSITION_TOLERANCE_MS`]. The first observation is
/// always a change.
pub fn status_changed(previous: Option<&PlaybackStatus>, current: &PlaybackStatus) -> bool {
    let Some(prev) = previous else {
        return true;
    };
    prev.state != current.state
        || prev.is_loading != current.is_loading
        || prev.duration_ms != current.duration_ms
        || current.position_ms.abs_diff(prev.position_ms) > POSITION_TOLERANCE_MS
        || prev.title != current.title
        || prev.filename != current.filename
}

/// Polls a status source and broadcasts through a sink at a bounded rate.
pub struct StatusMonitor<E, S> {
    engine: E,
    sink: S,
    settings: MonitorSettings,
    interval: chrono::Duration,
    state: MonitorState,
}

impl<E: StatusSource, S: MessageSink> StatusMonitor<E, S> {
    pub fn new(engine: E, sink: S, settings: MonitorSettings) -> Self {
        let interval = chrono::Duration::milliseconds(
            i64::try_from(settings.update_interval_ms).unwrap_or(i64::MAX),
        );
        Self {
            engine,
            sink,
            settings,
            interval,
            state: MonitorState::default(),
        }
    }

    /// Run one loop iteration at wall-clock time `now`.
    ///
    /// `now` must not decrease between calls.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if let Some(last) = self.state.last_poll {
            if now.signed_duration_since(last) < self.interval {
                return TickOutcome::Skipped;
            }
        }
        self.state.last_poll = Some(now);

        if let Some(prev) = self.state.last_query {
            debug!(
                interval_ms = now.signed_duration_since(prev).num_milliseconds(),
                "Query interval"
            );
        }
        self.state.last_query = Some(now);

        let (status, degraded) = match self.engine.query_status().await {
            Ok(status) => (status, false),
            Err(e) => {
                warn!("Status query failed, broadcasting stopped status: {e}");
                (PlaybackStatus::no_media(), true)
            }
        };

        let changed = status_changed(self.state.last_observed.as_ref(), &status);
        self.state.last_changed = changed;
        if changed {
            debug!(
                state = %status.state,
                position_ms = status.position_ms,
                duration_ms = status.duration_ms,
                title = %status.title,
                filename = %status.filename,
                loading = status.is_loading,
                "Status changed"
            );
            self.state.last_observed = Some(status.clone());
        }

        let message = BroadcastMessage::new(status, now, &self.settings.server_id);
        match message.to_json(self.settings.format) {
            Ok(payload) => {
                debug!(payload = %String::from_utf8_lossy(&payload), "Multicast JSON");
                if let Err(e) = self.sink.send(&payload).await {
                    warn!("Failed to send status broadcast: {e}");
                }
            }
            Err(e) => warn!("Failed to serialize status: {e}"),
        }

        if degraded {
            TickOutcome::Degraded(message)
        } else {
            TickOutcome::Broadcast(message)
        }
    }

    /// Whether the most recent admitted tick saw a meaningful change.
    pub fn last_tick_changed(&self) -> bool {
        self.state.last_changed
    }

    /// The status recorded at the last change.
    pub fn last_observed(&self) -> Option<&PlaybackStatus> {
        self.state.last_observed.as_ref()
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Tear down, handing back the collaborators.
    pub fn into_parts(self) -> (E, S) {
        (self.engine, self.sink)
    }
}
