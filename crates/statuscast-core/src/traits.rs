//! Collaborator interfaces of the broadcast loop.
//!
//! Every engine variant (VLC HTTP, VLC remote control, MPRIS, SMTC,
//! simulated) implements these, so the loop never knows which control
//! channel it is polling.

use std::future::Future;

use crate::error::{EngineError, TransportError};
use crate::models::PlaybackStatus;

/// Something that can report the current playback state.
pub trait StatusSource: Send {
    /// Query the engine once. Implementations bound their own I/O time.
    fn query_status(
        &mut self,
    ) -> impl Future<Output = Result<PlaybackStatus, EngineError>> + Send;
}

/// Where to move the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTarget {
    /// Offset from the current position; the result is clamped at zero.
    Relative(i64),
    /// Absolute position in milliseconds.
    Absolute(u64),
}

impl SeekTarget {
    /// Resolve against the current position.
    pub fn resolve(self, current_ms: i64) -> u64 {
        match self {
            Self::Relative(delta) => u64::try_from(current_ms.max(0).saturating_add(delta)).unwrap_or(0),
            Self::Absolute(ms) => ms,
        }
    }
}

/// The command surface a presentation layer forwards user intents into.
pub trait MediaEngine: StatusSource {
    /// Load a file. Implementations mark the status as loading until progress is seen.
    fn open(&mut self, path: &str) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn play(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn pause(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn stop(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn seek(&mut self, target: SeekTarget) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// One-way, best-effort message transport.
pub trait MessageSink: Send {
    fn send(&mut self, payload: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_seek_clamps_at_zero() {
        assert_eq!(SeekTarget::Relative(-10_000).resolve(4_000), 0);
        assert_eq!(SeekTarget::Relative(-10_000).resolve(15_000), 5_000);
    }

    #[test]
    fn test_relative_seek_from_unknown_position() {
        assert_eq!(SeekTarget::Relative(10_000).resolve(-1), 10_000);
    }

    #[test]
    fn test_absolute_seek_ignores_current() {
        assert_eq!(SeekTarget::Absolute(0).resolve(90_000), 0);
    }
}
