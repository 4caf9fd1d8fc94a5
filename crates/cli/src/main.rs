use std::process::ExitCode;

use supportdesk_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

/// stdout carries the JSON outcome line, so events go to stderr. A config that fails to load is
/// reported by the command itself; logging just stays off.
fn init_logging() {
    let Ok(config) = AppConfig::load(LoadOptions::default()) else {
        return;
    };
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    init_logging();
    supportdesk_cli::run()
}
