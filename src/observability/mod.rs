// Observability infrastructure using tracing crate
// Structured logging for the client and per-request spans

use anyhow::Result;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

const DEFAULT_FILTER: &str = "storefront_sync=info,storefront=info,reqwest=warn,hyper=warn";

/// Initialize the observability system
pub fn init(config: &LoggingConfig) -> Result<()> {
    // Example: RUST_LOG=storefront_sync=debug
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter.as_deref().unwrap_or(DEFAULT_FILTER)))?;

    let registry = tracing_subscriber::registry().with(filter_layer);

    // Logs go to stderr so command output on stdout stays clean
    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

/// Create a span for one outbound API request
#[inline]
pub fn request_span(method: &str, path: &str, generation: u64) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = method,
        path = path,
        generation = generation,
        request_id = %uuid::Uuid::new_v4(),
    )
}

#[inline]
pub fn record_request_duration(method: &str, status: u16, duration_ms: u64) {
    tracing::debug!(
        method = method,
        status = status,
        duration_ms = duration_ms,
        "request completed"
    );
}
