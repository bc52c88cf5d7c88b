use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use greenie_client::GreenieService;
use greenie_client::config::Config;
use greenie_client::controller::{ChatController, SubmitOutcome};
use greenie_client::image::FileImagePicker;
use greenie_client::message::format_message;
use greenie_client::models::{Message, MessageKind};
use greenie_client::text::format_relative_time;

const HELP: &str = "\
Commands:
  /image <path>   attach a photo to the next message
  /drop-image     remove the attached photo
  /save           save this conversation
  /sessions       list saved conversations
  /help           show this help
  /quit           exit";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();
    let service = GreenieService::new(&config);
    let mut chat = service.new_conversation();

    println!("{}", "Greenie - ask about plants, gardens and ecology".green().bold());
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/image" => match chat.attach_image(&FileImagePicker::new(arg.trim())) {
                Ok(true) => println!("{}", format!("Attached {}", arg.trim()).dimmed()),
                Ok(false) => println!("{}", "Not a supported image (jpg, png, gif, webp)".yellow()),
                Err(e) => println!("{}", e.to_string().red()),
            },
            "/drop-image" => {
                chat.set_image(None);
                println!("{}", "Image removed".dimmed());
            }
            "/save" => match chat.save_session(service.sessions()).await {
                Ok(session) => println!("{}", format!("Saved \"{}\"", session.title).dimmed()),
                Err(e) => println!("{}", format!("Could not save: {e}").red()),
            },
            "/sessions" => match service.sessions().list_sessions().await {
                Ok(sessions) if sessions.is_empty() => println!("{}", "No saved sessions".dimmed()),
                Ok(sessions) => {
                    let now = Utc::now();
                    for session in sessions {
                        println!(
                            "{}  {} ({} messages)",
                            format_relative_time(session.created_at, now).dimmed(),
                            session.title.bold(),
                            session.messages.len()
                        );
                    }
                }
                Err(e) => println!("{}", format!("Could not list sessions: {e}").red()),
            },
            _ => exchange(&mut chat, line).await,
        }
    }

    Ok(())
}

async fn exchange(chat: &mut ChatController, line: &str) {
    chat.set_input(line);
    if !chat.can_submit() {
        return;
    }

    let before = chat.messages().len();
    println!("{}", "Greenie is thinking...".dimmed());
    let outcome = chat.submit().await;
    if outcome == SubmitOutcome::Rejected {
        return;
    }

    // The user's own turn is already on screen.
    for message in chat.messages().iter().skip(before + 1) {
        render(message);
    }
}

fn render(message: &Message) {
    let view = format_message(message, Utc::now());
    match message.kind() {
        MessageKind::User { image } => {
            println!("{} {}", "You:".bold(), view.display_text);
            if let Some(image) = image {
                println!("    [photo: {}]", image.file_name());
            }
        }
        MessageKind::Bot { structured_data } => {
            println!("{} {}", "Greenie:".green().bold(), view.display_text);
            if let Some(data) = structured_data {
                for (key, value) in data {
                    println!("    {} {}", format!("{key}:").cyan(), value);
                }
            }
        }
        MessageKind::Error => println!("{}", view.display_text.red()),
        MessageKind::Typing => {}
    }
}
