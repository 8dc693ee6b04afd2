// Tracing subscriber setup
use crate::presentation::cli::LogLevel;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Log to stderr at `level`; `RUST_LOG` takes precedence when set.
/// Dependencies only log their warnings.
pub fn init(level: LogLevel) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    tracing::debug!("Logging initialized at level: {}", level.as_filter());
    Ok(())
}

fn default_directives(level: LogLevel) -> String {
    format!("warn,ccres_grafana={}", level.as_filter())
}
