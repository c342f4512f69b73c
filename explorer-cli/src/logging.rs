//! Subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to the
//! explorer crates only.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use explorer_core::{LogFormat, LogLevel};

const EXPLORER_CRATES: [&str; 5] = [
    "explorer",
    "explorer_core",
    "explorer_db",
    "explorer_ipfs",
    "explorer_sync",
];

/// Filter directives for `level` across the workspace crates
pub fn default_directives(level: LogLevel) -> String {
    EXPLORER_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .chain(std::iter::once(format!("explorer_cli={}", level)))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn init_logging(
    level: LogLevel,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(level))?,
    };

    match format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_file(true).with_line_number(true));
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact());
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
