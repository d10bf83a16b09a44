mod cli;
#[cfg(windows)]
mod com;
mod commands;

use std::process::ExitCode;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use wv2_common::{ConfigError, Wv2Error};
use wv2_config::BridgeConfig;

fn load_config(path: Option<&str>) -> Result<BridgeConfig, ConfigError> {
    match path {
        Some(path) => wv2_config::load_config_from(std::path::Path::new(path)),
        None => wv2_config::load_config(),
    }
}

fn run(args: &cli::Args, config: &BridgeConfig) -> Result<(), Wv2Error> {
    #[cfg(windows)]
    let _apartment = com::ComApartment::enter()?;

    let host = commands::Host::new(args.backend)?;
    let stdout = std::io::stdout();
    commands::run(&args.command, &host, config, &mut stdout.lock())
}

fn main() -> ExitCode {
    let args = cli::parse();

    // Config comes first: it supplies the default log level.
    let loaded = load_config(args.config.as_deref());
    let default_level = loaded
        .as_ref()
        .map(|config| config.logging.level)
        .unwrap_or_default();

    let log_directive = args
        .log_level
        .as_deref()
        .unwrap_or(default_level.as_directive());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                log_directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .init();

    tracing::debug!("wv2-probe v{} starting", env!("CARGO_PKG_VERSION"));

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        BridgeConfig::default()
    });

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
