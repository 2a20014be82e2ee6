//! The handler registry.
//!
//! [`EventHandlers`] holds one optional callback per event kind, plus the
//! generic update handler and the initialize/dispose lifecycle hooks. Every
//! slot is independent and may be left empty.
//!
//! Handlers are async closures that receive the client and an owned payload,
//! and return a [`Flow`] (or a `bool`, where `true` means continue):
//!
//! ```rust,ignore
//! use courier_framework::{EventHandlers, Flow};
//!
//! let handlers = EventHandlers::<MyClient>::new()
//!     .on_command(|bot, command, message| async move {
//!         if command == "quit" {
//!             return Flow::Stop;
//!         }
//!         bot.reply(&message, message.command_arguments()).await;
//!         Flow::Continue
//!     })
//!     .on_message(|_bot, message| async move {
//!         println!("{}", message.text());
//!         Flow::Continue
//!     });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use courier_core::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, PreCheckoutQuery, ShippingQuery,
    Update,
};

use crate::flow::Flow;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased handler receiving one payload.
pub type EventFn<C, T> = Box<dyn Fn(Arc<C>, T) -> BoxFuture<'static, Flow> + Send + Sync>;

/// A type-erased command handler receiving the command name and its message.
pub type CommandFn<C> =
    Box<dyn Fn(Arc<C>, String, Message) -> BoxFuture<'static, Flow> + Send + Sync>;

/// A type-erased lifecycle hook.
pub type HookFn<C, R> = Box<dyn Fn(Arc<C>) -> BoxFuture<'static, R> + Send + Sync>;

fn boxed_event<C, T, F, Fut, R>(f: F) -> EventFn<C, T>
where
    C: Send + Sync + 'static,
    T: 'static,
    F: Fn(Arc<C>, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Into<Flow> + 'static,
{
    Box::new(move |bot, payload| -> BoxFuture<'static, Flow> {
        let fut = f(bot, payload);
        Box::pin(async move { Into::<Flow>::into(fut.await) })
    })
}

/// The set of callbacks a run dispatches to. All slots are optional.
///
/// The caller owns the registry; the runner only borrows it for one run.
pub struct EventHandlers<C> {
    pub(crate) on_initialize: Option<HookFn<C, Flow>>,
    pub(crate) on_dispose: Option<HookFn<C, ()>>,
    pub(crate) on_update: Option<EventFn<C, Update>>,
    pub(crate) on_command: Option<CommandFn<C>>,
    pub(crate) on_message: Option<EventFn<C, Message>>,
    pub(crate) on_edited_message: Option<EventFn<C, Message>>,
    pub(crate) on_channel_post: Option<EventFn<C, Message>>,
    pub(crate) on_edited_channel_post: Option<EventFn<C, Message>>,
    pub(crate) on_inline_query: Option<EventFn<C, InlineQuery>>,
    pub(crate) on_chosen_inline_result: Option<EventFn<C, ChosenInlineResult>>,
    pub(crate) on_callback_query: Option<EventFn<C, CallbackQuery>>,
    pub(crate) on_shipping_query: Option<EventFn<C, ShippingQuery>>,
    pub(crate) on_pre_checkout_query: Option<EventFn<C, PreCheckoutQuery>>,
}

impl<C> Default for EventHandlers<C> {
    fn default() -> Self {
        Self {
            on_initialize: None,
            on_dispose: None,
            on_update: None,
            on_command: None,
            on_message: None,
            on_edited_message: None,
            on_channel_post: None,
            on_edited_channel_post: None,
            on_inline_query: None,
            on_chosen_inline_result: None,
            on_callback_query: None,
            on_shipping_query: None,
            on_pre_checkout_query: None,
        }
    }
}

impl<C: Send + Sync + 'static> EventHandlers<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once before any update is consumed.
    ///
    /// Returning [`Flow::Stop`] aborts the run without consuming updates.
    pub fn on_initialize<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_initialize = Some(Box::new(move |bot| -> BoxFuture<'static, Flow> {
            let fut = f(bot);
            Box::pin(async move { Into::<Flow>::into(fut.await) })
        }));
        self
    }

    /// Called once at shutdown.
    ///
    /// Only runs when an initialize hook is also registered and it allowed
    /// the run to start.
    pub fn on_dispose<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_dispose = Some(Box::new(move |bot| -> BoxFuture<'static, ()> {
            Box::pin(f(bot))
        }));
        self
    }

    /// Sees every raw update before classification.
    pub fn on_update<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, Update) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_update = Some(boxed_event(f));
        self
    }

    /// Receives messages that are commands, with the command name.
    ///
    /// A message routed here never also reaches the message handler.
    pub fn on_command<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, String, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_command = Some(Box::new(
            move |bot, command, message| -> BoxFuture<'static, Flow> {
                let fut = f(bot, command, message);
                Box::pin(async move { Into::<Flow>::into(fut.await) })
            },
        ));
        self
    }

    pub fn on_message<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_message = Some(boxed_event(f));
        self
    }

    pub fn on_edited_message<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_edited_message = Some(boxed_event(f));
        self
    }

    pub fn on_channel_post<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_channel_post = Some(boxed_event(f));
        self
    }

    pub fn on_edited_channel_post<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_edited_channel_post = Some(boxed_event(f));
        self
    }

    pub fn on_inline_query<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, InlineQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_inline_query = Some(boxed_event(f));
        self
    }

    pub fn on_chosen_inline_result<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, ChosenInlineResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_chosen_inline_result = Some(boxed_event(f));
        self
    }

    pub fn on_callback_query<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, CallbackQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_callback_query = Some(boxed_event(f));
        self
    }

    pub fn on_shipping_query<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, ShippingQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_shipping_query = Some(boxed_event(f));
        self
    }

    pub fn on_pre_checkout_query<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, PreCheckoutQuery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Flow> + 'static,
    {
        self.on_pre_checkout_query = Some(boxed_event(f));
        self
    }
}

impl<C> EventHandlers<C> {
    /// Names of the registered slots, in declaration order.
    pub fn registered(&self) -> Vec<&'static str> {
        [
            ("initialize", self.on_initialize.is_some()),
            ("dispose", self.on_dispose.is_some()),
            ("update", self.on_update.is_some()),
            ("command", self.on_command.is_some()),
            ("message", self.on_message.is_some()),
            ("edited_message", self.on_edited_message.is_some()),
            ("channel_post", self.on_channel_post.is_some()),
            ("edited_channel_post", self.on_edited_channel_post.is_some()),
            ("inline_query", self.on_inline_query.is_some()),
            ("chosen_inline_result", self.on_chosen_inline_result.is_some()),
            ("callback_query", self.on_callback_query.is_some()),
            ("shipping_query", self.on_shipping_query.is_some()),
            ("pre_checkout_query", self.on_pre_checkout_query.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    /// Returns `true` if no slot is registered.
    pub fn is_empty(&self) -> bool {
        self.registered().is_empty()
    }
}

impl<C> std::fmt::Debug for EventHandlers<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("registered", &self.registered())
            .finish()
    }
}
