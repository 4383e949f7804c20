#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows_smtc;

use statuscast_core::config::EngineKind;
#[cfg(any(target_os = "linux", target_os = "windows"))]
use statuscast_core::error::EngineError;

/// Nothing on the desktop bus to ask. The loop treats this as a failed
/// query and broadcasts the stopped status.
#[cfg(any(target_os = "linux", target_os = "windows"))]
pub(crate) fn no_player(what: &str) -> EngineError {
    EngineError::Unavailable(format!("no {what}"))
}

/// The desktop media-session engine this OS offers, if any.
pub fn native_engine_kind() -> Option<EngineKind> {
    #[cfg(target_os = "linux")]
    {
        Some(EngineKind::Mpris)
    }
    #[cfg(target_os = "windows")]
    {
        Some(EngineKind::Smtc)
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
