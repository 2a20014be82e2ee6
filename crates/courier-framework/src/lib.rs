//! # Courier Framework
//!
//! The dispatch layer of Courier.
//!
//! This layer provides:
//! - [`EventHandlers`], a registry with one optional callback per event kind
//!   plus lifecycle hooks
//! - [`route`], a pure classifier that picks at most one handler per update
//! - [`BotRunner`] and [`run_bot`], the sequential dispatch loop
//!
//! Handlers return a [`Flow`]; the first [`Flow::Stop`] ends the run and the
//! loop reports why through [`ExitReason`].

pub mod flow;
pub mod handlers;
pub mod route;
pub mod runner;

pub use flow::{ExitReason, Flow, Slot};
pub use handlers::{BoxFuture, CommandFn, EventFn, EventHandlers, HookFn};
pub use route::{Route, route};
pub use runner::{BotRunner, RunOptions, run_bot};

/// Prelude for common imports.
pub mod prelude {
    pub use super::flow::{ExitReason, Flow};
    pub use super::handlers::EventHandlers;
    pub use super::runner::{BotRunner, RunOptions, run_bot};
}
