//! Handler classification.
//!
//! [`route`] decides which handler an update goes to, without invoking
//! anything. The order is fixed:
//!
//! | Priority | Condition                                      | Slot                 |
//! |----------|------------------------------------------------|----------------------|
//! | 1        | message, is a command, command handler set     | `Command`            |
//! | 2        | message, message handler set                   | `Message`            |
//! | 3        | edited message                                 | `EditedMessage`      |
//! | 4        | channel post                                   | `ChannelPost`        |
//! | 5        | edited channel post                            | `EditedChannelPost`  |
//! | 6        | inline query                                   | `InlineQuery`        |
//! | 7        | chosen inline result                           | `ChosenInlineResult` |
//! | 8        | callback query                                 | `CallbackQuery`      |
//! | 9        | shipping query                                 | `ShippingQuery`      |
//! | 10       | pre-checkout query                             | `PreCheckoutQuery`   |
//! | else     | no payload, or its handler is not registered   | unhandled            |

use std::sync::Arc;

use courier_core::{
    CallbackQuery, ChosenInlineResult, InlineQuery, Message, Payload, PreCheckoutQuery,
    ShippingQuery, Update,
};

use crate::flow::{Flow, Slot};
use crate::handlers::{BoxFuture, CommandFn, EventFn, EventHandlers};

/// The outcome of classifying one update: the selected handler and the
/// payload it will receive, or the update itself if nothing matched.
pub enum Route<'h, C> {
    Command(&'h CommandFn<C>, Message),
    Message(&'h EventFn<C, Message>, Message),
    EditedMessage(&'h EventFn<C, Message>, Message),
    ChannelPost(&'h EventFn<C, Message>, Message),
    EditedChannelPost(&'h EventFn<C, Message>, Message),
    InlineQuery(&'h EventFn<C, InlineQuery>, InlineQuery),
    ChosenInlineResult(&'h EventFn<C, ChosenInlineResult>, ChosenInlineResult),
    CallbackQuery(&'h EventFn<C, CallbackQuery>, CallbackQuery),
    ShippingQuery(&'h EventFn<C, ShippingQuery>, ShippingQuery),
    PreCheckoutQuery(&'h EventFn<C, PreCheckoutQuery>, PreCheckoutQuery),
    Unhandled(Update),
}

impl<C> Route<'_, C> {
    /// The selected slot, or `None` for an unhandled update.
    pub fn slot(&self) -> Option<Slot> {
        Some(match self {
            Self::Command(..) => Slot::Command,
            Self::Message(..) => Slot::Message,
            Self::EditedMessage(..) => Slot::EditedMessage,
            Self::ChannelPost(..) => Slot::ChannelPost,
            Self::EditedChannelPost(..) => Slot::EditedChannelPost,
            Self::InlineQuery(..) => Slot::InlineQuery,
            Self::ChosenInlineResult(..) => Slot::ChosenInlineResult,
            Self::CallbackQuery(..) => Slot::CallbackQuery,
            Self::ShippingQuery(..) => Slot::ShippingQuery,
            Self::PreCheckoutQuery(..) => Slot::PreCheckoutQuery,
            Self::Unhandled(_) => return None,
        })
    }

    /// Invokes the selected handler.
    ///
    /// An unhandled route resolves to [`Flow::Continue`] without calling
    /// anything. The command name is derived from the message here.
    pub fn call(self, bot: Arc<C>) -> BoxFuture<'static, Flow> {
        match self {
            Self::Command(handler, message) => {
                let command = message.command().to_owned();
                handler(bot, command, message)
            }
            Self::Message(handler, message)
            | Self::EditedMessage(handler, message)
            | Self::ChannelPost(handler, message)
            | Self::EditedChannelPost(handler, message) => handler(bot, message),
            Self::InlineQuery(handler, query) => handler(bot, query),
            Self::ChosenInlineResult(handler, result) => handler(bot, result),
            Self::CallbackQuery(handler, query) => handler(bot, query),
            Self::ShippingQuery(handler, query) => handler(bot, query),
            Self::PreCheckoutQuery(handler, query) => handler(bot, query),
            Self::Unhandled(_) => Box::pin(std::future::ready(Flow::Continue)),
        }
    }
}

impl<C> std::fmt::Debug for Route<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unhandled(update) => f.debug_tuple("Unhandled").field(update).finish(),
            routed => f.debug_tuple("Route").field(&routed.slot()).finish(),
        }
    }
}

/// Classifies `update` against the registered handlers.
pub fn route<C>(update: Update, handlers: &EventHandlers<C>) -> Route<'_, C> {
    let update_id = update.update_id;

    // Picks the handler if registered, otherwise hands the update back.
    macro_rules! pick {
        ($handler:expr, $variant:ident, $payload:ident) => {
            match $handler {
                Some(handler) => Route::$variant(handler, $payload),
                None => Route::Unhandled(Update::new(update_id, Payload::$variant($payload))),
            }
        };
    }

    match update.payload {
        Payload::Message(message) => match (&handlers.on_command, &handlers.on_message) {
            (Some(handler), _) if message.is_command() => Route::Command(handler, message),
            (_, Some(handler)) => Route::Message(handler, message),
            _ => Route::Unhandled(Update::new(update_id, Payload::Message(message))),
        },
        Payload::EditedMessage(message) => {
            pick!(&handlers.on_edited_message, EditedMessage, message)
        }
        Payload::ChannelPost(message) => pick!(&handlers.on_channel_post, ChannelPost, message),
        Payload::EditedChannelPost(message) => {
            pick!(&handlers.on_edited_channel_post, EditedChannelPost, message)
        }
        Payload::InlineQuery(query) => pick!(&handlers.on_inline_query, InlineQuery, query),
        Payload::ChosenInlineResult(result) => {
            pick!(&handlers.on_chosen_inline_result, ChosenInlineResult, result)
        }
        Payload::CallbackQuery(query) => pick!(&handlers.on_callback_query, CallbackQuery, query),
        Payload::ShippingQuery(query) => pick!(&handlers.on_shipping_query, ShippingQuery, query),
        Payload::PreCheckoutQuery(query) => {
            pick!(&handlers.on_pre_checkout_query, PreCheckoutQuery, query)
        }
        Payload::Unknown => Route::Unhandled(Update::new(update_id, Payload::Unknown)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Chat, ChatKind, MessageEntity, ShippingAddress, User};

    struct Client;

    fn user() -> User {
        User {
            id: 1,
            first_name: "Ann".into(),
            ..Default::default()
        }
    }

    fn message(text: &str) -> Message {
        Message::new(1, Chat::new(1, ChatKind::Private), text)
    }

    fn command(text: &str, length: usize) -> Message {
        message(text).with_entity(MessageEntity::command(0, length))
    }

    /// One update per kind, each with only that payload set.
    fn one_of_each() -> Vec<(Payload, Slot)> {
        vec![
            (Payload::Message(message("hi")), Slot::Message),
            (Payload::EditedMessage(message("hi")), Slot::EditedMessage),
            (Payload::ChannelPost(message("hi")), Slot::ChannelPost),
            (Payload::EditedChannelPost(message("hi")), Slot::EditedChannelPost),
            (
                Payload::InlineQuery(InlineQuery {
                    id: "q".into(),
                    from: user(),
                    query: "cats".into(),
                    offset: String::new(),
                }),
                Slot::InlineQuery,
            ),
            (
                Payload::ChosenInlineResult(ChosenInlineResult {
                    result_id: "r".into(),
                    from: user(),
                    query: "cats".into(),
                    inline_message_id: None,
                }),
                Slot::ChosenInlineResult,
            ),
            (
                Payload::CallbackQuery(CallbackQuery {
                    id: "c".into(),
                    from: user(),
                    message: None,
                    inline_message_id: None,
                    chat_instance: "ci".into(),
                    data: Some("yes".into()),
                }),
                Slot::CallbackQuery,
            ),
            (
                Payload::ShippingQuery(ShippingQuery {
                    id: "s".into(),
                    from: user(),
                    invoice_payload: "p".into(),
                    shipping_address: ShippingAddress::default(),
                }),
                Slot::ShippingQuery,
            ),
            (
                Payload::PreCheckoutQuery(PreCheckoutQuery {
                    id: "p".into(),
                    from: user(),
                    currency: "EUR".into(),
                    total_amount: 100,
                    invoice_payload: "p".into(),
                    shipping_option_id: None,
                }),
                Slot::PreCheckoutQuery,
            ),
        ]
    }

    fn all_handlers() -> EventHandlers<Client> {
        EventHandlers::new()
            .on_command(|_, _, _| async { Flow::Continue })
            .on_message(|_, _| async { Flow::Continue })
            .on_edited_message(|_, _| async { Flow::Continue })
            .on_channel_post(|_, _| async { Flow::Continue })
            .on_edited_channel_post(|_, _| async { Flow::Continue })
            .on_inline_query(|_, _| async { Flow::Continue })
            .on_chosen_inline_result(|_, _| async { Flow::Continue })
            .on_callback_query(|_, _| async { Flow::Continue })
            .on_shipping_query(|_, _| async { Flow::Continue })
            .on_pre_checkout_query(|_, _| async { Flow::Continue })
    }

    #[test]
    fn test_each_kind_routes_to_its_slot() {
        let handlers = all_handlers();
        for (payload, slot) in one_of_each() {
            let routed = route(Update::new(1, payload), &handlers);
            assert_eq!(routed.slot(), Some(slot));
        }
    }

    #[test]
    fn test_each_kind_unhandled_without_handlers() {
        let handlers = EventHandlers::<Client>::new();
        for (payload, _) in one_of_each() {
            let kind = payload.kind();
            match route(Update::new(3, payload), &handlers) {
                Route::Unhandled(update) => {
                    assert_eq!(update.update_id, 3);
                    assert_eq!(update.kind(), kind);
                }
                other => panic!("expected unhandled, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_command_beats_message() {
        let handlers = all_handlers();
        let update = Update::new(1, Payload::Message(command("/start now", 6)));
        assert_eq!(route(update, &handlers).slot(), Some(Slot::Command));
    }

    #[test]
    fn test_command_entity_behind_formatting_routes_to_command() {
        let handlers = all_handlers();
        let message = message("/start now")
            .with_entity(MessageEntity::new("bold", 0, 10))
            .with_entity(MessageEntity::command(0, 6));
        let update = Update::new(1, Payload::Message(message));
        assert_eq!(route(update, &handlers).slot(), Some(Slot::Command));
    }

    #[test]
    fn test_command_without_command_handler_goes_to_message() {
        let handlers = EventHandlers::<Client>::new().on_message(|_, _| async { Flow::Continue });
        let update = Update::new(1, Payload::Message(command("/start", 6)));
        assert_eq!(route(update, &handlers).slot(), Some(Slot::Message));
    }

    #[test]
    fn test_plain_text_never_reaches_command_handler() {
        let handlers = EventHandlers::<Client>::new().on_command(|_, _, _| async { Flow::Continue });
        let update = Update::new(1, Payload::Message(message("hello")));
        assert!(route(update, &handlers).slot().is_none());
    }

    #[test]
    fn test_unknown_is_unhandled() {
        let handlers = all_handlers();
        let routed = route(Update::new(1, Payload::Unknown), &handlers);
        assert!(matches!(routed, Route::Unhandled(_)));
    }

    #[tokio::test]
    async fn test_command_call_receives_derived_name() {
        let handlers = EventHandlers::<Client>::new().on_command(|_, name, message| async move {
            assert_eq!(name, "command");
            assert_eq!(message.command_with_at(), "command@testbot");
            Flow::Stop
        });
        let update = Update::new(1, Payload::Message(command("/command@testbot", 16)));
        let flow = route(update, &handlers).call(Arc::new(Client)).await;
        assert_eq!(flow, Flow::Stop);
    }

    #[tokio::test]
    async fn test_unhandled_call_continues() {
        let handlers = EventHandlers::<Client>::new();
        let flow = route(Update::new(1, Payload::Unknown), &handlers)
            .call(Arc::new(Client))
            .await;
        assert_eq!(flow, Flow::Continue);
    }
}
