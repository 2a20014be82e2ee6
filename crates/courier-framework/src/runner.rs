//! The dispatch loop.
//!
//! A run consumes one update stream from an [`UpdateSource`] and dispatches
//! each update to at most one handler, strictly one after another:
//!
//! 1. Request the stream at the configured offset and poll timeout
//! 2. Await the initialize hook, if any; [`Flow::Stop`] ends the run here
//! 3. For each update: call the generic update handler, then classify with
//!    [`route`] and call the selected handler
//! 4. Stop on the first [`Flow::Stop`], a handler panic, or the end of the stream
//! 5. Log the shutdown and, when both initialize and dispose hooks are
//!    registered, await dispose
//!
//! Every handler, the lifecycle hooks included, runs behind a panic guard.
//! A panicking initialize hook ends the run as [`ExitReason::HandlerPanicked`]
//! before any update is consumed. A panicking dispose hook is logged and the
//! run keeps the reason the loop stopped for.
//!
//! There is no per-handler timeout; a handler that never completes stalls
//! the run.
//!
//! ```rust,ignore
//! use courier_framework::{BotRunner, EventHandlers, Flow, RunOptions};
//!
//! let handlers = EventHandlers::new()
//!     .on_message(|_bot, message| async move {
//!         println!("{}", message.text());
//!         Flow::Continue
//!     });
//!
//! let reason = BotRunner::new(client)
//!     .logger(Arc::new(MemoryLogger::new()))
//!     .options(RunOptions { debug: true, ..Default::default() })
//!     .run(&handlers)
//!     .await;
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use tracing::{Instrument, Level, debug, info, span, warn};

use courier_core::{BotLogger, DEFAULT_POLL_TIMEOUT, Update, UpdateConfig, UpdateSource};

use crate::flow::{ExitReason, Flow, Slot};
use crate::handlers::{BoxFuture, EventHandlers};
use crate::route::{Route, route};

/// Settings for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// First update id to request. The loop does not persist offsets.
    pub offset: i64,
    /// Long-poll timeout passed to the update source.
    pub poll_timeout: Duration,
    /// Log updates that no handler took.
    pub debug: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            debug: false,
        }
    }
}

/// Drives one dispatch run against a client.
pub struct BotRunner<C> {
    client: Arc<C>,
    logger: Arc<dyn BotLogger>,
    options: RunOptions,
}

impl<C: UpdateSource> BotRunner<C> {
    /// Creates a runner that logs through the process-wide default logger.
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            logger: Arc::new(courier_core::logger()),
            options: RunOptions::default(),
        }
    }

    /// Sets the logging sink for this run (builder pattern).
    pub fn logger(mut self, logger: Arc<dyn BotLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Sets the run options (builder pattern).
    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs until the stream ends or a handler stops the loop.
    pub async fn run(self, handlers: &EventHandlers<C>) -> ExitReason {
        let config = UpdateConfig::new(self.options.offset).with_timeout(self.options.poll_timeout);
        let mut updates = self.client.updates(config).await;

        if let Some(initialize) = &handlers.on_initialize {
            let client = Arc::clone(&self.client);
            match self.guarded(Slot::Initialize, || initialize(client)).await {
                Some(Flow::Continue) => {}
                Some(Flow::Stop) => {
                    info!(username = %self.client.username(), "Initialize hook refused startup");
                    return ExitReason::InitializeRefused;
                }
                None => return ExitReason::HandlerPanicked(Slot::Initialize),
            }
        }

        info!(
            username = %self.client.username(),
            handlers = ?handlers.registered(),
            "Dispatch loop started"
        );

        let mut reason = ExitReason::Exhausted;
        while let Some(update) = updates.next().await {
            let span = span!(
                Level::DEBUG,
                "update",
                update_id = update.update_id,
                kind = %update.kind()
            );
            if let Some(stop) = self.process(update, handlers).instrument(span).await {
                reason = stop;
                break;
            }
        }
        drop(updates);

        self.shutdown(handlers).await;
        info!(%reason, "Dispatch loop stopped");
        reason
    }

    /// Dispatches one update. Returns the exit reason if the loop must stop.
    async fn process(&self, update: Update, handlers: &EventHandlers<C>) -> Option<ExitReason> {
        if let Some(on_update) = &handlers.on_update {
            let client = Arc::clone(&self.client);
            let raw = update.clone();
            match self.guarded(Slot::Update, || on_update(client, raw)).await {
                Some(Flow::Continue) => {}
                Some(Flow::Stop) => return Some(ExitReason::StoppedByUpdateHandler),
                None => return Some(ExitReason::HandlerPanicked(Slot::Update)),
            }
        }

        let route = route(update, handlers);
        let Some(slot) = route.slot() else {
            self.log_unhandled(&route);
            return None;
        };
        debug!(%slot, "Dispatching to handler");

        let client = Arc::clone(&self.client);
        match self.guarded(slot, || route.call(client)).await {
            Some(Flow::Continue) => None,
            Some(Flow::Stop) => Some(ExitReason::StoppedByHandler(slot)),
            None => Some(ExitReason::HandlerPanicked(slot)),
        }
    }

    /// Invokes a handler, turning a panic into `None` after logging it.
    async fn guarded<T, F>(&self, slot: Slot, call: F) -> Option<T>
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        match outcome {
            Ok(value) => Some(value),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(%slot, %message, "Handler panicked");
                self.logger
                    .error_fmt(format_args!("{slot} handler panicked: {message}"));
                None
            }
        }
    }

    fn log_unhandled(&self, route: &Route<'_, C>) {
        if let Route::Unhandled(update) = route {
            debug!(kind = %update.kind(), "No handler for update");
            if self.options.debug {
                self.logger
                    .info_fmt(format_args!("Unhandled Bot Event: {update:?}"));
            }
        }
    }

    async fn shutdown(&self, handlers: &EventHandlers<C>) {
        self.logger
            .info_fmt(format_args!("Shutting down {}", self.client.username()));

        // Dispose requires a registered initialize hook.
        if handlers.on_initialize.is_some()
            && let Some(dispose) = &handlers.on_dispose
        {
            let client = Arc::clone(&self.client);
            self.guarded(Slot::Dispose, || dispose(client)).await;
        }
    }
}

impl<C> std::fmt::Debug for BotRunner<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs the dispatch loop with default options and the process-wide logger.
///
/// All handlers are optional.
pub async fn run_bot<C: UpdateSource>(client: Arc<C>, handlers: &EventHandlers<C>) -> ExitReason {
    BotRunner::new(client).run(handlers).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use courier_core::{
        CallbackQuery, ChannelSource, Chat, ChatKind, LogLevel, MemoryLogger, Message,
        MessageEntity, Payload, User,
    };

    const BOT_NAME: &str = "testbot";

    fn message(id: i64, text: &str) -> Update {
        Update::new(
            id,
            Payload::Message(Message::new(id, Chat::new(1, ChatKind::Private), text)),
        )
    }

    fn command(id: i64, text: &str, length: usize) -> Update {
        let message = Message::new(id, Chat::new(1, ChatKind::Private), text)
            .with_entity(MessageEntity::command(0, length));
        Update::new(id, Payload::Message(message))
    }

    fn callback(id: i64) -> Update {
        Update::new(
            id,
            Payload::CallbackQuery(CallbackQuery {
                id: id.to_string(),
                from: User {
                    id: 1,
                    first_name: "Ann".into(),
                    ..Default::default()
                },
                message: None,
                inline_message_id: None,
                chat_instance: "ci".into(),
                data: None,
            }),
        )
    }

    fn source(updates: Vec<Update>) -> Arc<ChannelSource> {
        Arc::new(ChannelSource::from_updates(BOT_NAME, updates))
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    async fn run_with(
        client: Arc<ChannelSource>,
        handlers: &EventHandlers<ChannelSource>,
        options: RunOptions,
    ) -> (ExitReason, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        let reason = BotRunner::new(client)
            .logger(logger.clone())
            .options(options)
            .run(handlers)
            .await;
        (reason, logger)
    }

    #[tokio::test]
    async fn test_command_preferred_over_message() {
        let commands = counter();
        let messages = counter();
        let (c, m) = (commands.clone(), messages.clone());

        let handlers = EventHandlers::new()
            .on_command(move |_, name, _| {
                let c = c.clone();
                async move {
                    assert_eq!(name, "start");
                    c.fetch_add(1, Ordering::SeqCst);
                    Flow::Continue
                }
            })
            .on_message(move |_, _| {
                let m = m.clone();
                async move {
                    m.fetch_add(1, Ordering::SeqCst);
                    Flow::Continue
                }
            });

        let client = source(vec![command(1, "/start", 6)]);
        let (reason, _) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::Exhausted);
        assert_eq!(commands.load(Ordering::SeqCst), 1);
        assert_eq!(messages.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_plain_message_goes_to_message_handler() {
        let commands = counter();
        let messages = counter();
        let (c, m) = (commands.clone(), messages.clone());

        let handlers = EventHandlers::new()
            .on_command(move |_, _, _| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Flow::Continue }
            })
            .on_message(move |_, _| {
                m.fetch_add(1, Ordering::SeqCst);
                async { Flow::Continue }
            });

        let client = source(vec![message(1, "hello")]);
        run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(commands.load(Ordering::SeqCst), 0);
        assert_eq!(messages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unrouted_updates_are_all_consumed() {
        let pulled = counter();
        let p = pulled.clone();
        let handlers = EventHandlers::new().on_update(move |_, _| {
            p.fetch_add(1, Ordering::SeqCst);
            async { Flow::Continue }
        });
        let client = source(vec![message(1, "a"), callback(2), message(3, "b")]);
        let (reason, logger) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::Exhausted);
        assert_eq!(pulled.load(Ordering::SeqCst), 3);
        assert!(logger.contains(LogLevel::Info, "Shutting down testbot"));
        // Unhandled updates are only logged in debug mode.
        assert!(!logger.contains(LogLevel::Info, "Unhandled"));
    }

    #[tokio::test]
    async fn test_unhandled_logged_in_debug_mode() {
        let handlers = EventHandlers::new();
        let client = source(vec![callback(1)]);
        let options = RunOptions {
            debug: true,
            ..Default::default()
        };
        let (_, logger) = run_with(client, &handlers, options).await;

        assert!(logger.contains(LogLevel::Info, "Unhandled Bot Event"));
    }

    #[tokio::test]
    async fn test_handler_stop_ends_loop() {
        let seen = counter();
        let s = seen.clone();
        let handlers = EventHandlers::new().on_callback_query(move |_, _| {
            s.fetch_add(1, Ordering::SeqCst);
            async { Flow::Stop }
        });

        let client = source(vec![callback(1), callback(2)]);
        let (reason, _) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::StoppedByHandler(Slot::CallbackQuery));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_handler_stop_skips_classification() {
        let updates_seen = counter();
        let messages = counter();
        let (u, m) = (updates_seen.clone(), messages.clone());

        let handlers = EventHandlers::new()
            .on_update(move |_, _| {
                u.fetch_add(1, Ordering::SeqCst);
                async { false }
            })
            .on_message(move |_, _| {
                m.fetch_add(1, Ordering::SeqCst);
                async { true }
            });

        let client = source(vec![message(1, "a"), message(2, "b")]);
        let (reason, _) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::StoppedByUpdateHandler);
        assert_eq!(updates_seen.load(Ordering::SeqCst), 1);
        assert_eq!(messages.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_handler_sees_every_update() {
        let updates_seen = counter();
        let u = updates_seen.clone();
        let handlers = EventHandlers::new().on_update(move |_, _| {
            u.fetch_add(1, Ordering::SeqCst);
            async { Flow::Continue }
        });

        let client = source(vec![message(1, "a"), callback(2), command(3, "/x", 2)]);
        run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(updates_seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_dispose_without_initialize_never_runs() {
        let disposed = counter();
        let d = disposed.clone();
        let handlers = EventHandlers::new().on_dispose(move |_| {
            d.fetch_add(1, Ordering::SeqCst);
            async {}
        });

        run_with(source(vec![message(1, "a")]), &handlers, RunOptions::default()).await;
        assert_eq!(disposed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialize_refusal_skips_everything() {
        let disposed = counter();
        let messages = counter();
        let (d, m) = (disposed.clone(), messages.clone());

        let handlers = EventHandlers::new()
            .on_initialize(|_| async { Flow::Stop })
            .on_dispose(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .on_message(move |_, _| {
                m.fetch_add(1, Ordering::SeqCst);
                async { Flow::Continue }
            });

        let client = source(vec![message(1, "a")]);
        let (reason, logger) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::InitializeRefused);
        assert_eq!(disposed.load(Ordering::SeqCst), 0);
        assert_eq!(messages.load(Ordering::SeqCst), 0);
        assert!(logger.lines().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_then_dispose_once() {
        let initialized = counter();
        let disposed = counter();
        let (i, d) = (initialized.clone(), disposed.clone());

        let handlers = EventHandlers::new()
            .on_initialize(move |bot: Arc<ChannelSource>| {
                assert_eq!(bot.username(), BOT_NAME);
                i.fetch_add(1, Ordering::SeqCst);
                async { true }
            })
            .on_dispose(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .on_message(|_, _| async { Flow::Stop });

        let client = source(vec![message(1, "a"), message(2, "b")]);
        let (reason, _) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::StoppedByHandler(Slot::Message));
        assert_eq!(initialized.load(Ordering::SeqCst), 1);
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_stops_and_disposes() {
        let disposed = counter();
        let d = disposed.clone();

        let handlers = EventHandlers::new()
            .on_initialize(|_| async { true })
            .on_dispose(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .on_message(|_, message: Message| async move {
                if message.text() == "boom" {
                    panic!("handler exploded");
                }
                Flow::Continue
            });

        let client = source(vec![message(1, "ok"), message(2, "boom"), message(3, "ok")]);
        let (reason, logger) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::HandlerPanicked(Slot::Message));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
        assert!(logger.contains(LogLevel::Error, "handler exploded"));
        assert!(logger.contains(LogLevel::Info, "Shutting down"));
    }

    #[tokio::test]
    async fn test_panicking_initialize_returns_reason() {
        let disposed = counter();
        let messages = counter();
        let (d, m) = (disposed.clone(), messages.clone());

        let handlers = EventHandlers::new()
            .on_initialize(|bot: Arc<ChannelSource>| async move {
                if bot.username() == BOT_NAME {
                    panic!("init exploded");
                }
                true
            })
            .on_dispose(move |_| {
                d.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .on_message(move |_, _| {
                m.fetch_add(1, Ordering::SeqCst);
                async { Flow::Continue }
            });

        let client = source(vec![message(1, "a")]);
        let (reason, logger) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::HandlerPanicked(Slot::Initialize));
        assert_eq!(messages.load(Ordering::SeqCst), 0);
        assert_eq!(disposed.load(Ordering::SeqCst), 0);
        assert!(logger.contains(LogLevel::Error, "initialize handler panicked: init exploded"));
        assert!(!logger.contains(LogLevel::Info, "Shutting down"));
    }

    #[tokio::test]
    async fn test_panicking_dispose_keeps_stop_reason() {
        let handlers = EventHandlers::new()
            .on_initialize(|_| async { true })
            .on_dispose(|bot: Arc<ChannelSource>| async move {
                if bot.username() == BOT_NAME {
                    panic!("dispose exploded");
                }
            })
            .on_message(|_, _| async { Flow::Stop });

        let client = source(vec![message(1, "a")]);
        let (reason, logger) = run_with(client, &handlers, RunOptions::default()).await;

        assert_eq!(reason, ExitReason::StoppedByHandler(Slot::Message));
        assert!(logger.contains(LogLevel::Info, "Shutting down testbot"));
        assert!(logger.contains(LogLevel::Error, "dispose handler panicked: dispose exploded"));
    }

    #[tokio::test]
    async fn test_offset_and_timeout_reach_source() {
        let seen = counter();
        let s = seen.clone();
        let handlers = EventHandlers::new().on_message(move |_, _| {
            s.fetch_add(1, Ordering::SeqCst);
            async { Flow::Continue }
        });

        let client = source(vec![message(1, "a"), message(2, "b"), message(3, "c")]);
        let options = RunOptions {
            offset: 2,
            ..Default::default()
        };
        run_with(client, &handlers, options).await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_source_ends_cleanly() {
        let (client, tx) = ChannelSource::new(BOT_NAME, 4);
        let client = Arc::new(client);
        let token = client.cancellation_token();

        let handlers = EventHandlers::new().on_message(move |_, _| {
            token.cancel();
            async { Flow::Continue }
        });

        tx.send(message(1, "a")).await.unwrap();
        let (reason, _) = run_with(client, &handlers, RunOptions::default()).await;

        // The sender is still alive; only the cancellation ended the stream.
        assert_eq!(reason, ExitReason::Exhausted);
        drop(tx);
    }
}
