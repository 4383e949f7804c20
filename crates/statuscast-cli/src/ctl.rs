//! One-shot engine commands, the scriptable form of the player controls.

use statuscast_core::error::EngineError;
use statuscast_core::models::PlaybackStatus;
use statuscast_core::traits::MediaEngine;
use statuscast_engine::toggle_play_pause;
use tracing::debug;

use crate::cli::CtlAction;

/// Apply `action` and return the status read back afterwards.
pub async fn execute<E: MediaEngine>(
    engine: &mut E,
    action: &CtlAction,
) -> Result<PlaybackStatus, EngineError> {
    debug!(?action, "Engine command");
    match action {
        CtlAction::Play => engine.play().await?,
        CtlAction::Pause => engine.pause().await?,
        CtlAction::Toggle => {
            toggle_play_pause(engine).await?;
        }
        CtlAction::Stop => engine.stop().await?,
        CtlAction::Open { path } => {
            engine.open(path).await?;
            engine.play().await?;
        }
        CtlAction::Seek { by, to } => {
            let target = CtlAction::seek_target(*by, *to)
                .ok_or_else(|| EngineError::Command("seek needs exactly one of --by or --to".into()))?;
            engine.seek(target).await?;
        }
        CtlAction::Status => {}
    }
    engine.query_status().await
}
