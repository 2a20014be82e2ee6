//! # Courier
//!
//! An event-dispatch layer over a messaging-platform bot API client.
//!
//! ## Overview
//!
//! Courier consumes a stream of updates from a client and routes each one to
//! at most one typed handler, chosen by a fixed priority table. Handlers steer
//! the loop by returning [`Flow`](prelude::Flow).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────────────────────┐
//! │ UpdateSource │────▶│  BotRunner   │────▶│ on_update                   │
//! │   (client)   │     │ (one task)   │     │   then one of: on_command,  │
//! └──────────────┘     └──────┬───────┘     │   on_message, on_callback…  │
//!                             │             └─────────────────────────────┘
//!                             ▼
//!                         BotLogger
//! ```
//!
//! - **core**: update model, entities, command parsing, sources, logging sink
//! - **framework**: handler registry, classification, dispatch loop
//! - **runtime**: configuration and tracing setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = courier::runtime::bootstrap(ConfigLoader::new())?;
//!
//!     let handlers = EventHandlers::new()
//!         .on_command(|_bot, command, _message| async move {
//!             if command == "quit" { Flow::Stop } else { Flow::Continue }
//!         })
//!         .on_message(|_bot, message| async move {
//!             info!("{}", message.text());
//!             Flow::Continue
//!         });
//!
//!     let reason = runner_from_config(client, &config).run(&handlers).await;
//!     info!(%reason, "Bot exited");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log lines

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Dispatch
    pub use courier_framework::{BotRunner, EventHandlers, ExitReason, Flow, RunOptions, run_bot};

    // Update model and entities
    pub use courier_core::{
        CallbackQuery, Chat, ChatKind, ChosenInlineResult, InlineQuery, Message, MessageEntity,
        Payload, PreCheckoutQuery, ShippingQuery, Update, UpdateKind, User,
    };

    // Producers and logging sink
    pub use courier_core::{BotLogger, ChannelSource, UpdateConfig, UpdateSource, set_logger};

    // Runtime setup
    pub use courier_runtime::{ConfigLoader, CourierConfig, runner_from_config};

    pub use courier_runtime::prelude::*;
}
