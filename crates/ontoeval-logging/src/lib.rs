//! # ontoeval-logging
//!
//! Two logging channels for ontoeval runs:
//!
//! - `tracing` diagnostics from the library crates, installed once per
//!   process with [`init_tracing`]
//! - benchmark progress as [`LogEvent`]s, written by a [`Logger`] in one of
//!   the [`LogFormat`]s and optionally mirrored to a JSON-lines file
//!
//! Both channels write to stderr so stdout stays free for command output.

mod events;

pub use events::{LogEvent, LogFormat, Logger, SkipReason};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Calling this a second time in
/// the same process is a no-op.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (json_layer, text_layer) = match format {
        LogFormat::Json => (
            Some(fmt::layer().json().with_target(false).with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Pretty | LogFormat::Compact => (
            None,
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        ),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
