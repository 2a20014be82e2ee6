//! Echo Bot Example
//!
//! Drives the Courier dispatch loop from the terminal: every line read from
//! stdin becomes one update, so the routing table can be explored by hand.
//!
//! # Input
//!
//! ```text
//! hello there          → message handler, echoed back
//! /echo some text      → command handler, replies "some text"
//! /help                → command handler, lists commands
//! /quit                → command handler, stops the loop
//! cb:<data>            → callback query handler
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --debug
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use clap::Parser;
use courier::prelude::*;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal echo bot for the Courier dispatcher")]
struct Args {
    /// Configuration file to load instead of searching.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bot username used in logs.
    #[arg(short, long, default_value = "echo_bot")]
    username: String,

    /// Log updates that no handler takes.
    #[arg(long)]
    debug: bool,
}

const HELP: &str = r"╭─────────────────────────────╮
│     Echo Bot - Commands     │
├─────────────────────────────┤
│ /echo <text> - Echo text    │
│ /help        - This help    │
│ /quit        - Stop the bot │
│ cb:<data>    - Button press │
╰─────────────────────────────╯";

// ============================================================================
// Input Parsing
// ============================================================================

fn terminal_user() -> User {
    User {
        id: 1,
        first_name: "Terminal".to_string(),
        username: Some("tty".to_string()),
        ..Default::default()
    }
}

/// Turns one input line into an update, tagging leading `/word` tokens as
/// bot commands the way the platform does.
fn line_to_update(id: i64, line: &str) -> Update {
    if let Some(data) = line.strip_prefix("cb:") {
        return Update::new(
            id,
            Payload::CallbackQuery(CallbackQuery {
                id: id.to_string(),
                from: terminal_user(),
                message: None,
                inline_message_id: None,
                chat_instance: "terminal".to_string(),
                data: Some(data.to_string()),
            }),
        );
    }

    let mut message =
        Message::new(id, Chat::new(1, ChatKind::Private), line).with_sender(terminal_user());
    if line.starts_with('/') {
        let token = line.split_whitespace().next().unwrap_or(line);
        message = message.with_entity(MessageEntity::command(0, token.encode_utf16().count()));
    }
    Update::new(id, Payload::Message(message))
}

/// Feeds input lines to the dispatch loop until the input ends or the loop
/// drops its receiver.
///
/// Runs on a plain thread. A blocking stdin read cannot be cancelled, and the
/// runtime would otherwise wait for it on shutdown.
fn pump_lines(input: impl BufRead, tx: mpsc::Sender<Update>) {
    let mut next_id = 1;
    for line in input.lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let update = line_to_update(next_id, line);
        next_id += 1;
        if tx.blocking_send(update).is_err() {
            // The loop stopped and dropped its receiver.
            break;
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn handlers() -> EventHandlers<ChannelSource> {
    EventHandlers::new()
        .on_initialize(|bot: Arc<ChannelSource>| async move {
            info!(username = bot.username(), "Echo bot ready, type /help");
            true
        })
        .on_dispose(|bot: Arc<ChannelSource>| async move {
            bot.cancel();
            info!("Echo bot disposed");
        })
        .on_command(|_bot, command, message: Message| async move {
            match command.as_str() {
                "quit" => return Flow::Stop,
                "help" => println!("{HELP}"),
                "echo" => println!("{}", message.command_arguments()),
                other => println!("Unknown command /{other}, try /help"),
            }
            Flow::Continue
        })
        .on_message(|_bot, message: Message| async move {
            let sender = message
                .from
                .as_ref()
                .map_or_else(|| "someone".to_string(), ToString::to_string);
            println!("{sender} said: {}", message.text());
            Flow::Continue
        })
        .on_callback_query(|_bot, query: CallbackQuery| async move {
            println!("Button pressed: {}", query.data.as_deref().unwrap_or(""));
            Flow::Continue
        })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = courier::runtime::bootstrap(loader)?;
    config.dispatch.debug |= args.debug;

    let (source, tx) = ChannelSource::new(args.username, 32);
    let client = Arc::new(source);

    let token = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, shutting down");
            token.cancel();
        }
    });

    // Detached: the process exits without waiting for the pending read.
    thread::spawn(move || pump_lines(std::io::stdin().lock(), tx));

    let handlers = handlers();
    let reason = runner_from_config(client, &config).run(&handlers).await;
    info!(%reason, "Dispatch loop exited");
    Ok(())
}
