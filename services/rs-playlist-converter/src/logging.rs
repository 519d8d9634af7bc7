//!
//! src/logging.rs  Andrew Belles  Oct 8th, 2025
//!
//! Initializes the tracing subscriber for the converter binary, either
//! human readable or flattened json, written through a non-blocking stdout
//!

use tracing_appender::non_blocking;
use tracing_error::ErrorLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::ConvertError;

/// Flushes buffered log lines when dropped, hold it for the life of main
pub struct LoggingGuard(tracing_appender::non_blocking::WorkerGuard);

/// RUST_LOG overrides the configured directives
fn build_filter(cfg: &LoggingConfig) -> Result<EnvFilter, ConvertError> {
    let directives = std::env::var("RUST_LOG")
        .ok()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| cfg.filter_directives.clone());
    EnvFilter::try_new(&directives)
        .map_err(|e| ConvertError::Config(format!("log filter {directives}: {e}")))
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, ConvertError> {
    let (writer, guard) = non_blocking(std::io::stdout());
    let filter = build_filter(cfg)?;
    let time = fmt::time::UtcTime::rfc_3339();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let installed = match cfg.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_ansi(false)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true);
            registry.with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_ansi(cfg.with_ansi)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .compact();
            registry.with(fmt_layer).try_init()
        }
    };

    installed.map_err(|e| ConvertError::Config(format!("logger already set: {e}")))?;
    Ok( LoggingGuard(guard) )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directives_parse() {
        let cfg = LoggingConfig::default();
        assert!(build_filter(&cfg).is_ok());
    }
}
