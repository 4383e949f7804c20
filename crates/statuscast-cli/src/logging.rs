use statuscast_core::config::{AppConfig, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_FILTER: &str = "statuscast=debug";

/// Filter precedence: `RUST_LOG`, then `--debug`, then the config file.
fn filter(config: &LoggingConfig, debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = if debug { DEBUG_FILTER } else { config.filter.as_str() };
        EnvFilter::try_new(directive).unwrap_or_else(|e| {
            eprintln!("invalid logging.filter {directive:?} ({e}), using {DEBUG_FILTER}");
            EnvFilter::new(DEBUG_FILTER)
        })
    })
}

/// Install the global subscriber. Keep the returned guard alive for the
/// whole process, or buffered file output is lost.
pub fn init(config: &LoggingConfig, debug: bool) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = if config.file {
        let dir = AppConfig::log_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("cannot create log directory {}: {e}", dir.display());
        }
        let appender = tracing_appender::rolling::daily(&dir, "statuscast.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_ansi(false).with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter(config, debug))
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}
