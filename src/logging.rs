//! Logging configuration using tracing

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting the run mode
pub const MODE_ENV: &str = "MODE";

/// Transport crates capped at WARN
pub const QUIET_TARGETS: &[&str] = &["hyper", "reqwest", "rustls", "tokio_tungstenite", "tungstenite"];

/// Logging format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Picks format and default level from `MODE`
///
/// `DEBUG` gives pretty DEBUG output for development; anything else is
/// production JSON at INFO.
pub fn mode_settings(mode: Option<&str>) -> (LogFormat, Level) {
    match mode {
        Some("DEBUG") => (LogFormat::Pretty, Level::DEBUG),
        _ => (LogFormat::Json, Level::INFO),
    }
}

/// Initialize logging with the specified format
///
/// `RUST_LOG` still overrides the default level.
pub fn init_logging(format: LogFormat, default_level: Level) {
    let env_filter = QUIET_TARGETS.iter().fold(
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy(),
        |filter, target| match quiet(target) {
            Some(directive) => filter.add_directive(directive),
            None => filter,
        },
    );

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true).with_thread_ids(false))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(true))
                .init();
        }
    }
}

/// Initialize logging from the `MODE` environment variable
pub fn init_from_env() {
    let mode = std::env::var(MODE_ENV).ok();
    let (format, level) = mode_settings(mode.as_deref());
    init_logging(format, level);
}

/// `<target>=warn`, or `None` if `target` is not a valid directive target
fn quiet(target: &str) -> Option<tracing_subscriber::filter::Directive> {
    format!("{}=warn", target).parse().ok()
}
