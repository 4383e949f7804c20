mod cli;
mod ctl;
mod listen;
mod logging;
mod runner;

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use statuscast_core::config::AppConfig;
use statuscast_core::display::status_line;
use statuscast_core::error::StatuscastError;
use statuscast_core::monitor::{MonitorSettings, StatusMonitor};
use statuscast_core::traits::MediaEngine;
use statuscast_engine::Engine;
use statuscast_net::{MulticastListener, MulticastSender};
use tracing::{error, info, warn};

use cli::{Cli, Command, ConfigAction, ListenArgs, ServeArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("statuscast: {e}");
            return ExitCode::FAILURE;
        }
    };
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));
    if let Command::Serve(args) = &command {
        args.apply(&mut config);
    }

    let _guard = logging::init(&config.logging, cli.debug);

    match run(command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, mut config: AppConfig) -> Result<(), StatuscastError> {
    match command {
        Command::Serve(args) => serve(config, args).await,
        Command::Listen(args) => listen(config, args).await,
        Command::Ctl { engine, action } => {
            if let Some(kind) = engine {
                config.engine.kind = kind;
            }
            let mut engine = Engine::from_config(&config.engine)?;
            let status = ctl::execute(&mut engine, &action).await?;
            println!("{}", status_line(&status));
            Ok(())
        }
        Command::Config { action } => {
            match action {
                ConfigAction::Path => println!("{}", AppConfig::config_path().display()),
                ConfigAction::Show => {
                    let text = toml::to_string_pretty(&config)
                        .map_err(|e| StatuscastError::Config(e.to_string()))?;
                    print!("{text}");
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, args: ServeArgs) -> Result<(), StatuscastError> {
    config.validate()?;

    let mut engine = Engine::from_config(&config.engine)?;
    if let Some(path) = &args.file {
        match engine.open(path).await {
            Ok(()) => {
                if let Err(e) = engine.play().await {
                    warn!(file = %path, "Opened but could not start playback: {e}");
                }
            }
            Err(e) => warn!(file = %path, "Could not open file: {e}"),
        }
    }

    let broadcast = &config.broadcast;
    let sender = MulticastSender::from_config(broadcast)?;
    let mut monitor = StatusMonitor::new(engine, sender, MonitorSettings::from(broadcast));

    info!(
        group = %broadcast.group,
        port = broadcast.port,
        interval_ms = broadcast.interval_ms,
        format = %broadcast.format,
        server_id = %broadcast.server_id,
        "Broadcasting status"
    );

    let options = runner::RunOptions {
        max_broadcasts: args.count,
        quiet_status: config.logging.quiet_status,
    };
    let sent = runner::run(&mut monitor, &options, shutdown_signal(), Utc::now).await;
    info!(broadcasts = sent, "Broadcast loop stopped");
    Ok(())
}

async fn listen(config: AppConfig, args: ListenArgs) -> Result<(), StatuscastError> {
    let group = args.group.unwrap_or(config.broadcast.group);
    let port = args.port.unwrap_or(config.broadcast.port);
    let interface = args.interface.unwrap_or(config.broadcast.interface);
    if !group.is_multicast() {
        return Err(StatuscastError::Config(format!(
            "{group} is not an IPv4 multicast address"
        )));
    }

    let listener = MulticastListener::bind(group, port, interface)?;
    listen::listen(&listener, args.raw, args.count, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
