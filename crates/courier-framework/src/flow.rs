//! Control-flow values exchanged between handlers and the dispatch loop.

use std::fmt;

/// What the dispatch loop should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flow {
    /// Proceed to the next update.
    #[default]
    Continue,
    /// Stop consuming updates and shut down.
    Stop,
}

impl Flow {
    pub fn is_continue(self) -> bool {
        self == Flow::Continue
    }

    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

/// `true` continues, `false` stops.
impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going { Flow::Continue } else { Flow::Stop }
    }
}

/// The handler slots. Per-update slots are listed in classification
/// priority order.
///
/// `Update` is the generic handler that sees every update before
/// classification. `Initialize` and `Dispose` are the lifecycle hooks and
/// only appear in [`ExitReason::HandlerPanicked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Initialize,
    Dispose,
    Update,
    Command,
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    InlineQuery,
    ChosenInlineResult,
    CallbackQuery,
    ShippingQuery,
    PreCheckoutQuery,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Dispose => "dispose",
            Self::Update => "update",
            Self::Command => "command",
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::ChannelPost => "channel_post",
            Self::EditedChannelPost => "edited_channel_post",
            Self::InlineQuery => "inline_query",
            Self::ChosenInlineResult => "chosen_inline_result",
            Self::CallbackQuery => "callback_query",
            Self::ShippingQuery => "shipping_query",
            Self::PreCheckoutQuery => "pre_checkout_query",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The update stream ended.
    Exhausted,
    /// The initialize hook returned [`Flow::Stop`]; nothing was consumed.
    InitializeRefused,
    /// The generic update handler returned [`Flow::Stop`].
    StoppedByUpdateHandler,
    /// A per-kind handler returned [`Flow::Stop`].
    StoppedByHandler(Slot),
    /// A handler panicked. The panic was logged and the loop shut down.
    ///
    /// A panic in the initialize hook ends the run like a refusal, without
    /// shutdown logging or dispose.
    HandlerPanicked(Slot),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => f.write_str("update stream ended"),
            Self::InitializeRefused => f.write_str("initialize hook refused startup"),
            Self::StoppedByUpdateHandler => f.write_str("stopped by update handler"),
            Self::StoppedByHandler(slot) => write!(f, "stopped by {slot} handler"),
            Self::HandlerPanicked(slot) => write!(f, "{slot} handler panicked"),
        }
    }
}
