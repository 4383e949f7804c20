pub mod loading;
pub mod media;
pub mod platform;
pub mod simulated;
pub mod vlc_http;
pub mod vlc_rc;

use std::time::Duration;

use statuscast_core::config::{EngineConfig, EngineKind};
use statuscast_core::error::EngineError;
use statuscast_core::models::PlaybackStatus;
use statuscast_core::traits::{MediaEngine, SeekTarget, StatusSource};
use tracing::info;

pub use loading::LoadingTracker;
pub use media::filename_from_uri;
pub use simulated::SimulatedEngine;
pub use vlc_http::VlcHttpEngine;
pub use vlc_rc::VlcRcEngine;

#[cfg(target_os = "linux")]
pub use platform::linux::MprisEngine;
#[cfg(target_os = "windows")]
pub use platform::windows_smtc::SmtcEngine;

/// Any supported engine, chosen at runtime from config.
pub enum Engine {
    VlcHttp(VlcHttpEngine),
    VlcRc(VlcRcEngine),
    #[cfg(target_os = "linux")]
    Mpris(MprisEngine),
    #[cfg(target_os = "windows")]
    Smtc(SmtcEngine),
    Simulated(SimulatedEngine),
}

macro_rules! dispatch {
    ($self:expr, $engine:ident => $call:expr) => {
        match $self {
            Engine::VlcHttp($engine) => $call,
            Engine::VlcRc($engine) => $call,
            #[cfg(target_os = "linux")]
            Engine::Mpris($engine) => $call,
            #[cfg(target_os = "windows")]
            Engine::Smtc($engine) => $call,
            Engine::Simulated($engine) => $call,
        }
    };
}

impl Engine {
    /// Build the configured engine, checking that it can be used at all.
    ///
    /// Network engines connect lazily, so a player that is not running yet
    /// is not an error here.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let loading = LoadingTracker::new(Duration::from_millis(config.loading_timeout_ms));

        let engine = match config.kind {
            EngineKind::VlcHttp => Self::VlcHttp(VlcHttpEngine::new(
                &config.http.url,
                &config.http.password,
                timeout,
                loading,
            )?),
            EngineKind::VlcRc => Self::VlcRc(VlcRcEngine::new(
                &config.rc.host,
                config.rc.port,
                timeout,
                loading,
            )),
            #[cfg(target_os = "linux")]
            EngineKind::Mpris => {
                let identity = Some(config.mpris.identity.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                Self::Mpris(MprisEngine::connect(identity, loading)?)
            }
            #[cfg(target_os = "windows")]
            EngineKind::Smtc => Self::Smtc(SmtcEngine::connect(loading)?),
            EngineKind::Simulated => Self::Simulated(SimulatedEngine::new(
                Some(Duration::from_millis(config.simulated.load_delay_ms)),
                Duration::from_millis(config.simulated.duration_ms),
                loading,
            )),
            #[allow(unreachable_patterns)]
            other => return Err(unsupported_here(other)),
        };

        info!(engine = %engine.kind(), "Media engine ready");
        Ok(engine)
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Self::VlcHttp(_) => EngineKind::VlcHttp,
            Self::VlcRc(_) => EngineKind::VlcRc,
            #[cfg(target_os = "linux")]
            Self::Mpris(_) => EngineKind::Mpris,
            #[cfg(target_os = "windows")]
            Self::Smtc(_) => EngineKind::Smtc,
            Self::Simulated(_) => EngineKind::Simulated,
        }
    }
}

fn unsupported_here(kind: EngineKind) -> EngineError {
    let hint = match platform::native_engine_kind() {
        Some(native) => format!("; this platform supports {native}"),
        None => String::new(),
    };
    EngineError::Unavailable(format!(
        "engine {kind} is not available on this platform{hint}"
    ))
}

impl StatusSource for Engine {
    async fn query_status(&mut self) -> Result<PlaybackStatus, EngineError> {
        dispatch!(self, e => e.query_status().await)
    }
}

impl MediaEngine for Engine {
    async fn open(&mut self, path: &str) -> Result<(), EngineError> {
        dispatch!(self, e => e.open(path).await)
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        dispatch!(self, e => e.play().await)
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        dispatch!(self, e => e.pause().await)
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        dispatch!(self, e => e.stop().await)
    }

    async fn seek(&mut self, target: SeekTarget) -> Result<(), EngineError> {
        dispatch!(self, e => e.seek(target).await)
    }
}

/// Space-bar behavior: pause when playing, otherwise play.
///
/// Returns the status the decision was based on.
pub async fn toggle_play_pause<E: MediaEngine>(engine: &mut E) -> Result<PlaybackStatus, EngineError> {
    let status = engine.query_status().await?;
    if status.is_playing() {
        engine.pause().await?;
    } else {
        engine.play().await?;
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statuscast_core::config::AppConfig;
    use statuscast_core::models::PlaybackState;

    fn simulated_config() -> EngineConfig {
        let mut config = AppConfig::default().engine;
        config.kind = EngineKind::Simulated;
        config.simulated.load_delay_ms = 0;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_simulated() {
        let mut engine = Engine::from_config(&simulated_config()).unwrap();
        assert_eq!(engine.kind(), EngineKind::Simulated);
        assert_eq!(
            engine.query_status().await.unwrap(),
            PlaybackStatus::no_media()
        );
    }

    #[tokio::test]
    async fn test_network_engines_build_without_a_player() {
        let mut config = AppConfig::default().engine;
        config.kind = EngineKind::VlcRc;
        assert_eq!(Engine::from_config(&config).unwrap().kind(), EngineKind::VlcRc);
        config.kind = EngineKind::VlcHttp;
        assert_eq!(Engine::from_config(&config).unwrap().kind(), EngineKind::VlcHttp);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_smtc_rejected_off_windows() {
        let mut config = AppConfig::default().engine;
        config.kind = EngineKind::Smtc;
        assert!(matches!(
            Engine::from_config(&config),
            Err(EngineError::Unavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_play_pause() {
        let mut engine = Engine::from_config(&simulated_config()).unwrap();
        engine.open("/music/a.mp3").await.unwrap();

        toggle_play_pause(&mut engine).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            engine.query_status().await.unwrap().state,
            PlaybackState::Playing
        );

        toggle_play_pause(&mut engine).await.unwrap();
        assert_eq!(
            engine.query_status().await.unwrap().state,
            PlaybackState::Paused
        );
    }
}
