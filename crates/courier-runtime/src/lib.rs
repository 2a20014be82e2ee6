//! Courier Runtime - process setup for the Courier dispatcher.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `CourierConfig`)
//! - Tracing subscriber setup (`LoggingBuilder`, `init_from_config`)
//! - Wiring from configuration to a ready [`BotRunner`]
//!
//! ```ignore
//! use courier_runtime::{ConfigLoader, bootstrap, runner_from_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = bootstrap(ConfigLoader::new())?;
//!     let reason = runner_from_config(client, &config).run(&handlers).await;
//!     tracing::info!(%reason, "Bot exited");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

use std::sync::Arc;

use courier_core::UpdateSource;
use courier_framework::BotRunner;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, CourierConfig, DispatchConfig, LoggingConfig,
    validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, init_from_config};

// Re-export tracing for use by bot crates
pub use tracing;
pub use tracing_subscriber;

/// Loads and validates configuration, then installs the tracing subscriber.
pub fn bootstrap(loader: ConfigLoader) -> RuntimeResult<CourierConfig> {
    let config = loader.load()?;
    validate_config(&config)?;
    init_from_config(&config.logging)?;
    tracing::debug!(?config.dispatch, "Runtime bootstrapped");
    Ok(config)
}

/// Builds a runner whose options come from `config.dispatch`.
pub fn runner_from_config<C: UpdateSource>(client: Arc<C>, config: &CourierConfig) -> BotRunner<C> {
    BotRunner::new(client).options(config.dispatch.to_options())
}

/// Prelude module for convenient imports.
///
/// This provides the commonly used logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
