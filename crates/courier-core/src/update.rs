//! The update envelope.
//!
//! An [`Update`] is one inbound event from the platform. On the wire it is a
//! JSON object where at most one of several optional payload fields is set
//! ([`RawUpdate`]). Inside Courier it is a sum type: [`Payload`] has exactly one
//! variant per update kind, so two payloads can never be live at once.
//!
//! ```text
//! RawUpdate { update_id, message?, edited_message?, ... }
//!     └── Update { update_id, payload: Payload }
//!         ├── Payload::Message(Message)
//!         ├── Payload::EditedMessage(Message)
//!         ├── ...
//!         └── Payload::Unknown
//! ```
//!
//! Conversion picks the first populated field in dispatch priority order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, PreCheckoutQuery, ShippingQuery,
};

/// Discriminant of a [`Payload`], without the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    Message,
    EditedMessage,
    ChannelPost,
    EditedChannelPost,
    InlineQuery,
    ChosenInlineResult,
    CallbackQuery,
    ShippingQuery,
    PreCheckoutQuery,
    /// The update carried no payload Courier understands.
    Unknown,
}

impl UpdateKind {
    /// Returns the wire field name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::EditedMessage => "edited_message",
            Self::ChannelPost => "channel_post",
            Self::EditedChannelPost => "edited_channel_post",
            Self::InlineQuery => "inline_query",
            Self::ChosenInlineResult => "chosen_inline_result",
            Self::CallbackQuery => "callback_query",
            Self::ShippingQuery => "shipping_query",
            Self::PreCheckoutQuery => "pre_checkout_query",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data carried by an update, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Message(Message),
    EditedMessage(Message),
    ChannelPost(Message),
    EditedChannelPost(Message),
    InlineQuery(InlineQuery),
    ChosenInlineResult(ChosenInlineResult),
    CallbackQuery(CallbackQuery),
    ShippingQuery(ShippingQuery),
    PreCheckoutQuery(PreCheckoutQuery),
    Unknown,
}

impl Payload {
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Message(_) => UpdateKind::Message,
            Self::EditedMessage(_) => UpdateKind::EditedMessage,
            Self::ChannelPost(_) => UpdateKind::ChannelPost,
            Self::EditedChannelPost(_) => UpdateKind::EditedChannelPost,
            Self::InlineQuery(_) => UpdateKind::InlineQuery,
            Self::ChosenInlineResult(_) => UpdateKind::ChosenInlineResult,
            Self::CallbackQuery(_) => UpdateKind::CallbackQuery,
            Self::ShippingQuery(_) => UpdateKind::ShippingQuery,
            Self::PreCheckoutQuery(_) => UpdateKind::PreCheckoutQuery,
            Self::Unknown => UpdateKind::Unknown,
        }
    }
}

/// One inbound event from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawUpdate", into = "RawUpdate")]
pub struct Update {
    /// Monotonic identifier assigned by the platform.
    pub update_id: i64,
    pub payload: Payload,
}

impl Update {
    pub fn new(update_id: i64, payload: Payload) -> Self {
        Self { update_id, payload }
    }

    pub fn kind(&self) -> UpdateKind {
        self.payload.kind()
    }

    /// Returns the plain message, if this is a message update.
    pub fn message(&self) -> Option<&Message> {
        match &self.payload {
            Payload::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Returns any message-like payload: message, channel post or an edit.
    pub fn any_message(&self) -> Option<&Message> {
        match &self.payload {
            Payload::Message(message)
            | Payload::EditedMessage(message)
            | Payload::ChannelPost(message)
            | Payload::EditedChannelPost(message) => Some(message),
            _ => None,
        }
    }
}

/// Wire representation of an update with one optional field per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUpdate {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<InlineQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_inline_result: Option<ChosenInlineResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_query: Option<ShippingQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_checkout_query: Option<PreCheckoutQuery>,
}

impl From<RawUpdate> for Update {
    fn from(raw: RawUpdate) -> Self {
        let payload = if let Some(message) = raw.message {
            Payload::Message(message)
        } else if let Some(message) = raw.edited_message {
            Payload::EditedMessage(message)
        } else if let Some(message) = raw.channel_post {
            Payload::ChannelPost(message)
        } else if let Some(message) = raw.edited_channel_post {
            Payload::EditedChannelPost(message)
        } else if let Some(query) = raw.inline_query {
            Payload::InlineQuery(query)
        } else if let Some(result) = raw.chosen_inline_result {
            Payload::ChosenInlineResult(result)
        } else if let Some(query) = raw.callback_query {
            Payload::CallbackQuery(query)
        } else if let Some(query) = raw.shipping_query {
            Payload::ShippingQuery(query)
        } else if let Some(query) = raw.pre_checkout_query {
            Payload::PreCheckoutQuery(query)
        } else {
            Payload::Unknown
        };

        Update::new(raw.update_id, payload)
    }
}

impl From<Update> for RawUpdate {
    fn from(update: Update) -> Self {
        let mut raw = RawUpdate {
            update_id: update.update_id,
            ..Default::default()
        };
        match update.payload {
            Payload::Message(m) => raw.message = Some(m),
            Payload::EditedMessage(m) => raw.edited_message = Some(m),
            Payload::ChannelPost(m) => raw.channel_post = Some(m),
            Payload::EditedChannelPost(m) => raw.edited_channel_post = Some(m),
            Payload::InlineQuery(q) => raw.inline_query = Some(q),
            Payload::ChosenInlineResult(r) => raw.chosen_inline_result = Some(r),
            Payload::CallbackQuery(q) => raw.callback_query = Some(q),
            Payload::ShippingQuery(q) => raw.shipping_query = Some(q),
            Payload::PreCheckoutQuery(q) => raw.pre_checkout_query = Some(q),
            Payload::Unknown => {}
        }
        raw
    }
}
