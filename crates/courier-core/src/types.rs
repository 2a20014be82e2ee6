//! Domain entities carried by updates.
//!
//! These mirror the messaging platform's JSON objects closely enough to be
//! deserialized straight from the wire. Only the fields the dispatcher and
//! common handlers need are modelled; unknown fields are ignored.
//!
//! The interesting logic lives on [`Message`]: command detection and
//! extraction are derived from the message text and its entity annotations
//! every time they are requested.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EntityError, EntityResult};

/// The character that opens a command invocation.
pub const COMMAND_MARKER: char = '/';

/// Base URL used to build download links for [`File`]s.
pub const FILE_ENDPOINT: &str = "https://api.telegram.org/file/bot";

// ============================================================================
// User & Chat
// ============================================================================

/// A platform user or bot account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl User {
    /// Returns the user's full name, followed by the username in parentheses
    /// when one is set.
    pub fn full_name(&self) -> String {
        let mut name = self.first_name.clone();
        if let Some(last) = self.last_name.as_deref().filter(|s| !s.is_empty()) {
            name.push(' ');
            name.push_str(last);
        }
        if let Some(username) = self.username.as_deref().filter(|s| !s.is_empty()) {
            name.push_str(" (");
            name.push_str(username);
            name.push(')');
        }
        name
    }
}

/// Displays the username when present, otherwise first and last name.
impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(username) = self.username.as_deref().filter(|s| !s.is_empty()) {
            return f.write_str(username);
        }
        f.write_str(&self.first_name)?;
        if let Some(last) = self.last_name.as_deref().filter(|s| !s.is_empty()) {
            write!(f, " {last}")?;
        }
        Ok(())
    }
}

/// Chat classification as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// A conversation: private chat, group, supergroup or channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Chat {
    /// Creates a chat with only the id and kind set.
    pub fn new(id: i64, kind: ChatKind) -> Self {
        Self {
            id,
            kind,
            title: None,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }

    pub fn is_group(&self) -> bool {
        self.kind == ChatKind::Group
    }

    pub fn is_super_group(&self) -> bool {
        self.kind == ChatKind::Supergroup
    }

    pub fn is_channel(&self) -> bool {
        self.kind == ChatKind::Channel
    }
}

// ============================================================================
// Message Entities
// ============================================================================

/// A metadata span over message text, such as a command, mention or link.
///
/// `offset` and `length` are measured in UTF-16 code units, as sent by the
/// platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl MessageEntity {
    /// Creates an entity of the given kind covering `offset..offset + length`.
    pub fn new(kind: impl Into<String>, offset: usize, length: usize) -> Self {
        Self {
            kind: kind.into(),
            offset,
            length,
            ..Default::default()
        }
    }

    /// Creates a `bot_command` entity.
    pub fn command(offset: usize, length: usize) -> Self {
        Self::new("bot_command", offset, length)
    }

    pub fn is_mention(&self) -> bool {
        self.kind == "mention"
    }

    pub fn is_hashtag(&self) -> bool {
        self.kind == "hashtag"
    }

    pub fn is_command(&self) -> bool {
        self.kind == "bot_command"
    }

    pub fn is_url(&self) -> bool {
        self.kind == "url"
    }

    pub fn is_email(&self) -> bool {
        self.kind == "email"
    }

    pub fn is_bold(&self) -> bool {
        self.kind == "bold"
    }

    pub fn is_italic(&self) -> bool {
        self.kind == "italic"
    }

    pub fn is_code(&self) -> bool {
        self.kind == "code"
    }

    pub fn is_pre(&self) -> bool {
        self.kind == "pre"
    }

    pub fn is_text_link(&self) -> bool {
        self.kind == "text_link"
    }

    /// Parses the entity's URL. Only `text_link` entities carry one.
    pub fn parse_url(&self) -> EntityResult<Url> {
        match self.url.as_deref() {
            None | Some("") => Err(EntityError::MissingUrl),
            Some(raw) => Ok(Url::parse(raw)?),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A message in a chat, channel post, or an edited version of either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Unix time in seconds.
    pub date: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
}

impl Message {
    /// Creates a text message in the given chat with no sender or entities.
    pub fn new(message_id: i64, chat: Chat, text: impl Into<String>) -> Self {
        Self {
            message_id,
            from: None,
            date: 0,
            chat,
            text: Some(text.into()),
            entities: Vec::new(),
        }
    }

    /// Adds an entity annotation (builder pattern).
    pub fn with_entity(mut self, entity: MessageEntity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Sets the sender (builder pattern).
    pub fn with_sender(mut self, user: User) -> Self {
        self.from = Some(user);
        self
    }

    /// The message text, or an empty string for non-text messages.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// The time the message was sent.
    pub fn time(&self) -> SystemTime {
        let secs = u64::try_from(self.date).unwrap_or_default();
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// Returns `true` if the text starts with the command marker and some
    /// `bot_command` entity at offset 0 spans a non-empty token.
    pub fn is_command(&self) -> bool {
        self.command_end().is_some()
    }

    /// The command name without the marker and without any `@botname` suffix.
    ///
    /// Returns an empty string when the message is not a command.
    pub fn command(&self) -> &str {
        let command = self.command_with_at();
        command.split_once('@').map_or(command, |(name, _)| name)
    }

    /// The command token without the marker, keeping any `@botname` suffix.
    pub fn command_with_at(&self) -> &str {
        match self.command_end() {
            Some(end) => &self.text()[COMMAND_MARKER.len_utf8()..end],
            None => "",
        }
    }

    /// Everything after the command token and the one character that
    /// separates it from the arguments, trimmed.
    ///
    /// The separator is skipped regardless of what it is, so
    /// `/command-rest of text` yields `rest of text`.
    pub fn command_arguments(&self) -> &str {
        let Some(end) = self.command_end() else {
            return "";
        };
        let mut rest = self.text()[end..].chars();
        rest.next();
        rest.as_str().trim()
    }

    /// Byte index in `text` where the command entity ends.
    fn command_end(&self) -> Option<usize> {
        let text = self.text();
        if !text.starts_with(COMMAND_MARKER) {
            return None;
        }
        let entity = self
            .entities
            .iter()
            .find(|entity| entity.is_command() && entity.offset == 0)?;
        if entity.length <= COMMAND_MARKER.len_utf16() {
            return None;
        }
        utf16_to_byte_index(text, entity.length)
    }
}

/// Converts a UTF-16 code unit count into a byte index into `text`.
///
/// Returns `None` if the count is past the end of the text or falls inside a
/// surrogate pair.
fn utf16_to_byte_index(text: &str, units: usize) -> Option<usize> {
    let mut seen = 0;
    for (index, ch) in text.char_indices() {
        if seen == units {
            return Some(index);
        }
        seen += ch.len_utf16();
        if seen > units {
            return None;
        }
    }
    (seen == units).then_some(text.len())
}

// ============================================================================
// Queries
// ============================================================================

/// An incoming inline query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    pub query: String,
    #[serde(default)]
    pub offset: String,
}

/// A result of an inline query that was chosen by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub result_id: String,
    pub from: User,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
}

/// A press on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Box<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub chat_instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A shipping address supplied during checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub country_code: String,
    #[serde(default)]
    pub state: String,
    pub city: String,
    pub street_line1: String,
    #[serde(default)]
    pub street_line2: String,
    pub post_code: String,
}

/// An incoming shipping query for an invoice with a flexible price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuery {
    pub id: String,
    pub from: User,
    pub invoice_payload: String,
    pub shipping_address: ShippingAddress,
}

/// An incoming pre-checkout query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub from: User,
    pub currency: String,
    /// Total price in the smallest units of the currency.
    pub total_amount: i64,
    pub invoice_payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_option_id: Option<String>,
}

// ============================================================================
// Files
// ============================================================================

/// A file ready to be downloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl File {
    /// Builds the download link for this file using the bot token.
    pub fn link(&self, token: &str) -> String {
        format!(
            "{FILE_ENDPOINT}{token}/{}",
            self.file_path.as_deref().unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message(text: &str) -> Message {
        Message::new(1, Chat::new(10, ChatKind::Private), text)
    }

    fn command_message(text: &str, length: usize) -> Message {
        text_message(text).with_entity(MessageEntity::command(0, length))
    }

    fn user(username: Option<&str>, last_name: Option<&str>) -> User {
        User {
            id: 0,
            is_bot: true,
            first_name: "FirstTest".into(),
            last_name: last_name.map(Into::into),
            username: username.map(Into::into),
            language_code: Some("en".into()),
        }
    }

    #[test]
    fn test_user_display() {
        assert_eq!(user(None, Some("LastTest")).to_string(), "FirstTest LastTest");
        assert_eq!(user(Some("@test"), Some("LastTest")).to_string(), "@test");
        assert_eq!(user(Some(""), None).to_string(), "FirstTest");
    }

    #[test]
    fn test_user_full_name() {
        assert_eq!(
            user(Some("@test"), Some("LastTest")).full_name(),
            "FirstTest LastTest (@test)"
        );
        assert_eq!(user(None, Some("LastTest")).full_name(), "FirstTest LastTest");
        assert_eq!(user(Some("@test"), None).full_name(), "FirstTest (@test)");
        assert_eq!(user(None, None).full_name(), "FirstTest");
    }

    #[test]
    fn test_message_time() {
        let message = text_message("");
        assert_eq!(message.time(), UNIX_EPOCH);

        let mut later = text_message("");
        later.date = 90;
        assert_eq!(later.time(), UNIX_EPOCH + Duration::from_secs(90));
    }

    #[test]
    fn test_is_command() {
        assert!(command_message("/command", 8).is_command());
        assert!(!text_message("some text").is_command());
        assert!(!text_message("").is_command());
        // An entity alone is not enough without the marker.
        assert!(!command_message("command", 7).is_command());
        // The token must not be just the marker.
        assert!(!command_message("/", 1).is_command());
    }

    #[test]
    fn test_is_command_needs_leading_entity() {
        let message = text_message("/command").with_entity(MessageEntity::command(1, 7));
        assert!(!message.is_command());

        let message = text_message("/command").with_entity(MessageEntity::new("bold", 0, 8));
        assert!(!message.is_command());
    }

    #[test]
    fn test_is_command_finds_entity_after_others() {
        let message = text_message("/start now")
            .with_entity(MessageEntity::new("bold", 0, 10))
            .with_entity(MessageEntity::command(0, 6));
        assert!(message.is_command());
        assert_eq!(message.command(), "start");
        assert_eq!(message.command_arguments(), "now");
    }

    #[test]
    fn test_command() {
        assert_eq!(command_message("/command", 8).command(), "command");
        assert_eq!(text_message("").command(), "");
        assert_eq!(text_message("test text").command(), "");
    }

    #[test]
    fn test_command_with_bot_name() {
        let message = command_message("/command@testbot", 16);
        assert_eq!(message.command(), "command");
        assert_eq!(message.command_with_at(), "command@testbot");
    }

    #[test]
    fn test_command_arguments() {
        let message = command_message("/command with arguments", 8);
        assert_eq!(message.command(), "command");
        assert_eq!(message.command_arguments(), "with arguments");
    }

    #[test]
    fn test_command_arguments_malformed_separator() {
        let message = command_message("/command-without argument space", 8);
        assert_eq!(message.command_arguments(), "without argument space");
    }

    #[test]
    fn test_command_arguments_empty() {
        assert_eq!(text_message("/command").command_arguments(), "");
        assert_eq!(command_message("/command", 8).command_arguments(), "");
        assert_eq!(command_message("/command   ", 8).command_arguments(), "");
        assert_eq!(text_message("test text").command_arguments(), "");
    }

    #[test]
    fn test_command_offsets_are_utf16() {
        // "é" is one UTF-16 unit but two bytes.
        let message = command_message("/café au lait", 5);
        assert_eq!(message.command(), "café");
        assert_eq!(message.command_arguments(), "au lait");

        // Entity longer than the text is rejected.
        assert!(!command_message("/cmd", 12).is_command());
    }

    #[test]
    fn test_entity_parse_url() {
        let mut entity = MessageEntity::new("text_link", 0, 4);
        entity.url = Some("https://www.google.com".into());
        assert!(entity.parse_url().is_ok());

        entity.url = Some(String::new());
        assert!(matches!(entity.parse_url(), Err(EntityError::MissingUrl)));

        entity.url = Some("not a url".into());
        assert!(matches!(entity.parse_url(), Err(EntityError::InvalidUrl(_))));
    }

    #[test]
    fn test_entity_kinds() {
        assert!(MessageEntity::new("mention", 0, 1).is_mention());
        assert!(MessageEntity::new("hashtag", 0, 1).is_hashtag());
        assert!(MessageEntity::new("bot_command", 0, 1).is_command());
        assert!(MessageEntity::new("url", 0, 1).is_url());
        assert!(MessageEntity::new("email", 0, 1).is_email());
        assert!(MessageEntity::new("bold", 0, 1).is_bold());
        assert!(MessageEntity::new("italic", 0, 1).is_italic());
        assert!(MessageEntity::new("code", 0, 1).is_code());
        assert!(MessageEntity::new("pre", 0, 1).is_pre());
        assert!(MessageEntity::new("text_link", 0, 1).is_text_link());
        assert!(!MessageEntity::new("bold", 0, 1).is_italic());
    }

    #[test]
    fn test_chat_kinds() {
        assert!(Chat::new(10, ChatKind::Private).is_private());
        assert!(Chat::new(10, ChatKind::Group).is_group());
        assert!(Chat::new(10, ChatKind::Channel).is_channel());
        assert!(Chat::new(10, ChatKind::Supergroup).is_super_group());
        assert!(!Chat::new(10, ChatKind::Supergroup).is_group());
    }

    #[test]
    fn test_chat_kind_from_json() {
        let chat: Chat = serde_json::from_str(r#"{"id": 5, "type": "supergroup"}"#).unwrap();
        assert!(chat.is_super_group());
    }

    #[test]
    fn test_file_link() {
        let file = File {
            file_path: Some("test/test.txt".into()),
            ..Default::default()
        };
        assert_eq!(
            file.link("token"),
            "https://api.telegram.org/file/bottoken/test/test.txt"
        );
    }
}
