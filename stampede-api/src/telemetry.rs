//! Telemetry bootstrap.
//!
//! Installs the tracing subscriber with an env-driven filter and a JSON fmt
//! layer. Called once at startup before anything logs.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Initialize the tracing subscriber.
///
/// Honors `RUST_LOG`; without it, engine and API crates log at debug and
/// everything else at info.
pub fn init_telemetry() -> ApiResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stampede_api=debug,stampede_cache=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {e}")))?;

    tracing::info!("Telemetry initialized");
    Ok(())
}
