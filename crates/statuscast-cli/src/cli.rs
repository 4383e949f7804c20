use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use statuscast_core::config::{AppConfig, EngineKind};
use statuscast_core::traits::SeekTarget;
use statuscast_core::wire::WireFormat;

#[derive(Parser, Debug)]
#[command(
    name = "statuscast",
    version,
    about = "Poll a media player and multicast its playback status as JSON"
)]
pub struct Cli {
    /// Config file to use instead of the per-user one.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging (ignored when RUST_LOG is set).
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the broadcast loop (default).
    Serve(ServeArgs),
    /// Join the group and print every status message received.
    Listen(ListenArgs),
    /// Send one command to the media engine and print the resulting status.
    Ctl {
        #[arg(long)]
        engine: Option<EngineKind>,
        #[command(subcommand)]
        action: CtlAction,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    #[arg(long)]
    pub engine: Option<EngineKind>,
    #[arg(long)]
    pub group: Option<Ipv4Addr>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
    #[arg(long)]
    pub format: Option<WireFormat>,
    /// Open and play this file on startup.
    #[arg(long, value_name = "PATH")]
    pub file: Option<String>,
    /// Stop after this many broadcasts.
    #[arg(long, value_name = "N")]
    pub count: Option<u64>,
    /// Only log the status line when it changes.
    #[arg(long)]
    pub quiet_status: bool,
}

impl ServeArgs {
    /// Layer command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(kind) = self.engine {
            config.engine.kind = kind;
        }
        if let Some(group) = self.group {
            config.broadcast.group = group;
        }
        if let Some(port) = self.port {
            config.broadcast.port = port;
        }
        if let Some(interval) = self.interval_ms {
            config.broadcast.interval_ms = interval;
        }
        if let Some(format) = self.format {
            config.broadcast.format = format;
        }
        if self.quiet_status {
            config.logging.quiet_status = true;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ListenArgs {
    #[arg(long)]
    pub group: Option<Ipv4Addr>,
    #[arg(long)]
    pub port: Option<u16>,
    /// Local interface to join on.
    #[arg(long)]
    pub interface: Option<Ipv4Addr>,
    /// Print payloads as received instead of decoding them.
    #[arg(long)]
    pub raw: bool,
    /// Exit after this many datagrams.
    #[arg(long, value_name = "N")]
    pub count: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CtlAction {
    Play,
    Pause,
    /// Pause when playing, otherwise play.
    Toggle,
    Stop,
    /// Load a file and start playing it.
    Open { path: String },
    /// Move the playhead, relative (`--by -10000`) or absolute (`--to 0`).
    Seek {
        #[arg(long, value_name = "MS", allow_hyphen_values = true, conflicts_with = "to", required_unless_present = "to")]
        by: Option<i64>,
        #[arg(long, value_name = "MS")]
        to: Option<u64>,
    },
    /// Only print the current status.
    Status,
}

impl CtlAction {
    pub fn seek_target(by: Option<i64>, to: Option<u64>) -> Option<SeekTarget> {
        match (by, to) {
            (Some(delta), None) => Some(SeekTarget::Relative(delta)),
            (None, Some(ms)) => Some(SeekTarget::Absolute(ms)),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the user config file location.
    Path,
    /// Print the effective configuration as TOML.
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["statuscast"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "statuscast",
            "--debug",
            "serve",
            "--engine",
            "simulated",
            "--port",
            "12345",
            "--format",
            "legacy",
            "--count",
            "3",
        ])
        .unwrap();
        assert!(cli.debug);
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve");
        };

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.engine.kind, EngineKind::Simulated);
        assert_eq!(config.broadcast.port, 12345);
        assert_eq!(config.broadcast.format, WireFormat::Legacy);
        assert_eq!(config.broadcast.group, Ipv4Addr::new(239, 255, 0, 100));
        assert_eq!(args.count, Some(3));
    }

    #[test]
    fn test_seek_needs_exactly_one_target() {
        let cli = Cli::try_parse_from(["statuscast", "ctl", "seek", "--by", "-10000"]).unwrap();
        let Some(Command::Ctl { action: CtlAction::Seek { by, to }, .. }) = cli.command else {
            panic!("expected ctl seek");
        };
        assert_eq!(CtlAction::seek_target(by, to), Some(SeekTarget::Relative(-10_000)));

        assert!(Cli::try_parse_from(["statuscast", "ctl", "seek"]).is_err());
        assert!(Cli::try_parse_from(["statuscast", "ctl", "seek", "--by", "1", "--to", "2"]).is_err());
    }

    #[test]
    fn test_unknown_engine_rejected() {
        assert!(Cli::try_parse_from(["statuscast", "serve", "--engine", "winamp"]).is_err());
    }
}
