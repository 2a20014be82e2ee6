//! # Courier Core
//!
//! The foundation layer of Courier, an event-dispatch layer over a bot API
//! client.
//!
//! This crate defines what flows into the dispatch loop and what the loop
//! logs through:
//!
//! - **Update model**: the sum-typed envelope ([`Update`], [`Payload`]) and
//!   its wire form ([`RawUpdate`])
//! - **Domain entities**: [`Message`], [`User`], [`Chat`] and the query
//!   types, including command derivation on [`Message`]
//! - **Update producers**: the [`UpdateSource`] trait and the in-process
//!   [`ChannelSource`]
//! - **Logging sink**: [`BotLogger`] with an injectable, replaceable
//!   [`LoggerHandle`]
//!
//! ```text
//! ┌──────────────┐  UpdateStream  ┌──────────────┐     ┌───────────┐
//! │ UpdateSource │───────────────▶│  BotRunner   │────▶│  Handler  │
//! │ (transport)  │                │ (framework)  │     └───────────┘
//! └──────────────┘                └──────┬───────┘
//!                                        ▼
//!                                   BotLogger
//! ```

pub mod error;
pub mod logger;
pub mod source;
pub mod types;
pub mod update;

pub use error::{EntityError, EntityResult, LoggerError, LoggerResult};
pub use logger::{
    BotLogger, LogLevel, LoggerHandle, MemoryLogger, TracingLogger, logger, set_logger,
};
pub use source::{ChannelSource, DEFAULT_POLL_TIMEOUT, UpdateConfig, UpdateSource, UpdateStream};
pub use types::{
    COMMAND_MARKER, CallbackQuery, Chat, ChatKind, ChosenInlineResult, File, InlineQuery, Message,
    MessageEntity, PreCheckoutQuery, ShippingAddress, ShippingQuery, User,
};
pub use update::{Payload, RawUpdate, Update, UpdateKind};

/// Prelude for common imports.
pub mod prelude {
    pub use super::logger::BotLogger;
    pub use super::source::{UpdateConfig, UpdateSource};
    pub use super::types::{Chat, ChatKind, Message, MessageEntity, User};
    pub use super::update::{Payload, Update, UpdateKind};
}
