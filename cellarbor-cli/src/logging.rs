//! Logging initialisation for the cellarbor CLI.
//!
//! Installs a global `tracing` subscriber and bridges the `log` facade so
//! crates using either API emit structured events. Diagnostics go to
//! `stderr`; the rendered clustering on `stdout` stays machine-readable.

use std::{env, sync::OnceLock};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

const LOG_FORMAT_ENV: &str = "CELLARBOR_LOG_FORMAT";

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Output formats supported by the subscriber.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LogFormat {
    Human,
    Json,
}

/// Errors raised while initialising structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Environment variable contained invalid UTF-8 data.
    #[error("environment variable `{name}` contained invalid UTF-8: {source}")]
    InvalidUnicode {
        /// Name of the offending environment variable.
        name: &'static str,
        /// Underlying parse failure.
        #[source]
        source: env::VarError,
    },
    /// Unsupported log format requested via `CELLARBOR_LOG_FORMAT`.
    #[error("unsupported log format `{provided}`; expected `human` or `json`")]
    UnsupportedFormat {
        /// Raw value supplied by the user.
        provided: String,
    },
    /// Failed to install the global tracing subscriber.
    #[error("failed to install tracing subscriber: {source}")]
    InstallFailed {
        /// Error raised by `tracing_subscriber`.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Install global structured logging if it has not already been configured.
///
/// The format defaults to human-readable output and can be switched to JSON
/// by setting `CELLARBOR_LOG_FORMAT=json`; the level is controlled via
/// `RUST_LOG`.
///
/// # Errors
/// Returns [`LoggingError`] if the environment variable contains invalid
/// Unicode, the requested format is unsupported, or the subscriber cannot
/// be installed.
pub fn init_logging() -> Result<(), LoggingError> {
    if INITIALISED.get().is_some() {
        return Ok(());
    }

    match install_subscriber(format_from_env()?) {
        Ok(()) => {}
        Err(LoggingError::InstallFailed { source }) => {
            eprintln!("structured logging already configured elsewhere: {source}");
        }
        Err(err) => return Err(err),
    }
    let _ = INITIALISED.set(());
    Ok(())
}

fn format_from_env() -> Result<LogFormat, LoggingError> {
    match env::var(LOG_FORMAT_ENV) {
        Ok(raw) => parse_log_format(&raw),
        Err(env::VarError::NotPresent) => Ok(LogFormat::Human),
        Err(err @ env::VarError::NotUnicode(_)) => Err(LoggingError::InvalidUnicode {
            name: LOG_FORMAT_ENV,
            source: err,
        }),
    }
}

fn install_subscriber(format: LogFormat) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let fmt_layer = match format {
        LogFormat::Human => fmt_layer.boxed(),
        LogFormat::Json => fmt_layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    };

    // Bridging the log facade is best-effort; if another logger already owns
    // the global slot we keep the existing configuration.
    let _ = LogTracer::init();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|source| LoggingError::InstallFailed { source })
}

fn parse_log_format(raw: &str) -> Result<LogFormat, LoggingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "human" => Ok(LogFormat::Human),
        "json" => Ok(LogFormat::Json),
        other => Err(LoggingError::UnsupportedFormat {
            provided: other.to_owned(),
        }),
    }
}
