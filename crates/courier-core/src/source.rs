//! Update producers.
//!
//! The dispatch loop does not know how updates are fetched. It asks an
//! [`UpdateSource`] for a stream once and reads it until it ends. Long
//! polling, webhooks and retries all live behind this trait.
//!
//! [`ChannelSource`] is an in-process producer fed through a tokio channel.
//! It is what tests and demos drive the loop with, and a convenient bridge
//! for transports that already push updates from a background task.

use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::update::Update;

/// Long-poll timeout used when none is configured.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// A lazy, non-restartable sequence of updates.
pub type UpdateStream = BoxStream<'static, Update>;

/// Parameters for starting an update sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateConfig {
    /// First update id to deliver. Older updates are skipped.
    pub offset: i64,
    /// How long a single long-poll request may wait for new updates.
    pub timeout: Duration,
}

impl UpdateConfig {
    /// Creates a config starting at `offset` with the default poll timeout.
    pub fn new(offset: i64) -> Self {
        Self {
            offset,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Sets the long-poll timeout (builder pattern).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

/// A connected bot client that can produce updates.
///
/// The returned stream ends silently when the transport closes or the
/// client's context is cancelled. Ending is never an error.
#[async_trait]
pub trait UpdateSource: Send + Sync + 'static {
    /// The bot's own username, used in lifecycle log lines.
    fn username(&self) -> &str;

    /// Begins an update sequence.
    async fn updates(&self, config: UpdateConfig) -> UpdateStream;
}

/// An [`UpdateSource`] backed by a bounded tokio channel.
///
/// The stream ends when every sender is dropped or when the source's
/// [`CancellationToken`] is cancelled. It can only be taken once; later calls
/// to [`updates`](UpdateSource::updates) yield an empty stream.
pub struct ChannelSource {
    username: String,
    receiver: Mutex<Option<mpsc::Receiver<Update>>>,
    token: CancellationToken,
}

impl ChannelSource {
    /// Creates a source and the sender that feeds it.
    pub fn new(username: impl Into<String>, buffer: usize) -> (Self, mpsc::Sender<Update>) {
        let (tx, rx) = mpsc::channel(buffer);
        let source = Self {
            username: username.into(),
            receiver: Mutex::new(Some(rx)),
            token: CancellationToken::new(),
        };
        (source, tx)
    }

    /// Creates a source that yields exactly `updates` and then ends.
    pub fn from_updates(username: impl Into<String>, updates: Vec<Update>) -> Self {
        let (source, tx) = Self::new(username, updates.len().max(1));
        for update in updates {
            // Capacity covers every update, so this cannot fail.
            let _ = tx.try_send(update);
        }
        source
    }

    /// Token that ends the stream when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Ends the stream after the update currently being handled.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

#[async_trait]
impl UpdateSource for ChannelSource {
    fn username(&self) -> &str {
        &self.username
    }

    async fn updates(&self, config: UpdateConfig) -> UpdateStream {
        let Some(rx) = self.receiver.lock().take() else {
            warn!(username = %self.username, "Update stream already taken");
            return stream::empty().boxed();
        };
        debug!(
            offset = config.offset,
            timeout_secs = config.timeout.as_secs(),
            "Starting channel update stream"
        );

        let offset = config.offset;
        stream::unfold((rx, self.token.clone()), |(mut rx, token)| async move {
            let update = token.run_until_cancelled(rx.recv()).await.flatten()?;
            Some((update, (rx, token)))
        })
        .filter(move |update| future::ready(update.update_id >= offset))
        .boxed()
    }
}

impl std::fmt::Debug for ChannelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSource")
            .field("username", &self.username)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
