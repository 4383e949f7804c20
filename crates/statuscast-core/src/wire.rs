//! JSON wire format of the multicast stream.
//!
//! One self-contained JSON object per datagram, no framing. Key names are a
//! compatibility contract with existing consumers and must not change.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PlaybackState, PlaybackStatus};

/// Default `server_id` carried by every message.
pub const DEFAULT_SERVER_ID: &str = "vlc-status-server";

/// Which projection of the status goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Flat object with state name and all flags.
    #[default]
    Rich,
    /// Nested `vlc_data` object with `is_playing` only.
    Legacy,
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rich" => Ok(Self::Rich),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown wire format: {other} (expected rich or legacy)")),
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rich => f.write_str("rich"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// One broadcast: a status snapshot stamped with capture time and server id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastMessage {
    pub server_timestamp_ms: i64,
    pub server_id: String,
    pub status: PlaybackStatus,
}

#[derive(Debug, Serialize, Deserialize)]
struct RichRecord<'a> {
    server_timestamp: i64,
    server_id: Cow<'a, str>,
    state: PlaybackState,
    is_playing: bool,
    is_paused: bool,
    is_stopped: bool,
    is_loading: bool,
    time_ms: i64,
    duration_ms: i64,
    title: Cow<'a, str>,
    filename: Cow<'a, str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyRecord<'a> {
    server_timestamp: i64,
    server_id: Cow<'a, str>,
    vlc_data: LegacyData<'a>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyData<'a> {
    is_playing: bool,
    time: i64,
    duration: i64,
    title: Cow<'a, str>,
    filename: Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnyRecord<'a> {
    Rich(RichRecord<'a>),
    Legacy(LegacyRecord<'a>),
}

impl BroadcastMessage {
    /// Stamp a status with the capture time (converted to UTC epoch milliseconds).
    pub fn new(status: PlaybackStatus, captured_at: DateTime<Utc>, server_id: &str) -> Self {
        Self {
            server_timestamp_ms: captured_at.timestamp_millis(),
            server_id: server_id.to_string(),
            status,
        }
    }

    /// Serialize to the datagram payload.
    pub fn to_json(&self, format: WireFormat) -> Result<Vec<u8>, serde_json::Error> {
        let s = &self.status;
        match format {
            WireFormat::Rich => serde_json::to_vec(&RichRecord {
                server_timestamp: self.server_timestamp_ms,
                server_id: Cow::Borrowed(&self.server_id),
                state: s.state,
                is_playing: s.is_playing(),
                is_paused: s.is_paused(),
                is_stopped: s.is_stopped(),
                is_loading: s.is_loading,
                time_ms: s.position_ms,
                duration_ms: s.duration_ms,
                title: Cow::Borrowed(&s.title),
                filename: Cow::Borrowed(&s.filename),
            }),
            WireFormat::Legacy => serde_json::to_vec(&LegacyRecord {
                server_timestamp: self.server_timestamp_ms,
                server_id: Cow::Borrowed(&self.server_id),
                vlc_data: LegacyData {
                    is_playing: s.is_playing(),
                    time: s.position_ms,
                    duration: s.duration_ms,
                    title: Cow::Borrowed(&s.title),
                    filename: Cow::Borrowed(&s.filename),
                },
            }),
        }
    }

    /// Parse a datagram payload in either format.
    ///
    /// Legacy messages carry no paused/loading information, so anything not
    /// playing decodes as stopped.
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let record: AnyRecord<'_> = serde_json::from_slice(payload)?;
        Ok(match record {
            AnyRecord::Rich(r) => Self {
                server_timestamp_ms: r.server_timestamp,
                server_id: r.server_id.into_owned(),
                status: PlaybackStatus {
                    state: r.state,
                    position_ms: r.time_ms,
                    duration_ms: r.duration_ms,
                    title: r.title.into_owned(),
                    filename: r.filename.into_owned(),
                    is_loading: r.is_loading,
                },
            },
            AnyRecord::Legacy(r) => Self {
                server_timestamp_ms: r.server_timestamp,
                server_id: r.server_id.into_owned(),
                status: PlaybackStatus {
                    state: if r.vlc_data.is_playing {
                        PlaybackState::Playing
                    } else {
                        PlaybackState::Stopped
                    },
                    position_ms: r.vlc_data.time,
                    duration_ms: r.vlc_data.duration,
                    title: r.vlc_data.title.into_owned(),
                    filename: r.vlc_data.filename.into_owned(),
                    is_loading: false,
                },
            },
        })
    }

    /// Capture time as a UTC datetime, if representable.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.server_timestamp_ms)
    }
}
