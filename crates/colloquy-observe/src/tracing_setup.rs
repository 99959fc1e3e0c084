//! Tracing subscriber initialization with structured logging.
//!
//! # Usage
//!
//! ```no_run
//! colloquy_observe::tracing_setup::init_tracing().unwrap();
//! ```

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Installs a structured `fmt` layer with target visibility and span
/// close timing, filtered via `RUST_LOG` (`EnvFilter::from_default_env`).
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
