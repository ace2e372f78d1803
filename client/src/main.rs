//! Terminal chat client for a Tertulia relay.
//!
//! Every line typed is sent as a message. `/name <new name>` changes the
//! display name until the first message goes out; `/quit` leaves.

use clap::Parser;
use tertulia_client::composer::{local_timestamp, sanitize_markup, visible_text};
use tertulia_client::{ChatClient, ClientError, SendOutcome, DEFAULT_NAME};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SERVER: &str = "ws://localhost:6969";

#[derive(Parser, Debug)]
#[command(name = "tertulia", version, about = "Chat through a Tertulia relay")]
struct Args {
    /// Relay address
    #[arg(long, env = "TERTULIA_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Display name, fixed after the first message
    #[arg(long, env = "TERTULIA_NAME", default_value = DEFAULT_NAME)]
    name: String,
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Rename(String),
    Say(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed == "/quit" {
            Input::Quit
        } else if let Some(name) = trimmed.strip_prefix("/name ") {
            Input::Rename(name.trim().to_string())
        } else {
            Input::Say(line.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so they stay out of the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tertulia_client=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut client = ChatClient::new(args.name);
    client.on_receive(|msg| {
        let text = visible_text(&sanitize_markup(&msg.text));
        println!(
            "[{}] {} ({}) says: {}",
            local_timestamp(),
            msg.name,
            msg.sender_tag,
            text.trim_end()
        );
    });

    client.connect(&args.server).await?;
    println!("[{}] System says: Welcome to the chat!", local_timestamp());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        if !client.is_connected() {
            eprintln!("Not connected to the relay.");
            break;
        }

        match Input::parse(&line) {
            Input::Quit => break,
            Input::Rename(name) => match client.set_name(name) {
                Ok(()) => eprintln!("You are now {}.", client.name()),
                Err(e) => eprintln!("Cannot rename: {}.", e),
            },
            Input::Say(text) => {
                if client.send(&text) == SendOutcome::NotConnected {
                    eprintln!("Not connected to the relay.");
                }
            }
        }
    }

    client.disconnect().await;
    Ok(())
}
