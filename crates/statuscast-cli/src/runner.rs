//! Drives the broadcast loop and presents each broadcast on the console.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use statuscast_core::display::status_line;
use statuscast_core::monitor::StatusMonitor;
use statuscast_core::traits::{MessageSink, StatusSource};
use statuscast_core::wire::BroadcastMessage;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// How often the loop wakes to offer a tick; the monitor enforces the
/// actual broadcast interval.
pub const POLL_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many broadcasts.
    pub max_broadcasts: Option<u64>,
    /// Only log the status line when the status changed.
    pub quiet_status: bool,
}

/// Run until `shutdown` resolves or the broadcast limit is reached.
///
/// `clock` is read once per wake-up. Returns the number of broadcasts.
pub async fn run<E, S, C>(
    monitor: &mut StatusMonitor<E, S>,
    options: &RunOptions,
    shutdown: impl Future<Output = ()>,
    clock: C,
) -> u64
where
    E: StatusSource,
    S: MessageSink,
    C: Fn() -> DateTime<Utc>,
{
    let mut ticker = interval(POLL_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut broadcasts = 0u64;
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {}
        }

        let outcome = monitor.tick(clock()).await;
        let Some(message) = outcome.message() else {
            continue;
        };

        broadcasts += 1;
        present(message, monitor.last_tick_changed(), options.quiet_status);

        if options.max_broadcasts.is_some_and(|max| broadcasts >= max) {
            info!(broadcasts, "Broadcast limit reached");
            break;
        }
    }
    broadcasts
}

fn present(message: &BroadcastMessage, changed: bool, quiet: bool) {
    if changed {
        info!(changed, "{}", status_line(&message.status));
    } else if !quiet {
        info!("{}", status_line(&message.status));
    }
}
