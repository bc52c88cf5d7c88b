//! Constructors for conversation turns and helpers deriving display data from them.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ImageReference, Message, MessageKind, ParsedReply};
use crate::text::{extract_keywords, format_relative_time, generate_id, truncate};

pub const DEFAULT_ERROR_TEXT: &str =
    "Sorry, there was an error processing your request. Please try again.";
pub const TYPING_INDICATOR_ID: &str = "typing-indicator";
pub const DEFAULT_TITLE: &str = "New Chat";
pub const TITLE_MAX_LENGTH: usize = 25;

const IMAGE_REQUEST_TERMS: &[&str] = &[
    "identify",
    "what is this",
    "what plant",
    "what flower",
    "what tree",
    "what species",
    "recognize",
    "diagnose",
    "plant disease",
    "leaf problem",
    "pest",
    "analyze photo",
    "analyze image",
    "check this plant",
];

pub fn new_user_message(text: impl Into<String>, image: Option<ImageReference>) -> Message {
    Message::new(
        generate_id(),
        text.into(),
        MessageKind::User { image },
        Utc::now(),
    )
}

pub fn new_bot_message(text: impl Into<String>) -> Message {
    Message::new(
        generate_id(),
        text.into(),
        MessageKind::Bot {
            structured_data: None,
        },
        Utc::now(),
    )
}

/// Bot turn built from a parsed reply; keeps any structured payload alongside the text.
pub fn new_bot_reply(reply: ParsedReply) -> Message {
    Message::new(
        generate_id(),
        reply.text,
        MessageKind::Bot {
            structured_data: reply.structured_data,
        },
        Utc::now(),
    )
}

pub fn new_error_message(text: Option<&str>) -> Message {
    Message::new(
        generate_id(),
        text.unwrap_or(DEFAULT_ERROR_TEXT).to_string(),
        MessageKind::Error,
        Utc::now(),
    )
}

pub fn new_typing_indicator() -> Message {
    Message::new(
        TYPING_INDICATOR_ID.to_string(),
        String::new(),
        MessageKind::Typing,
        Utc::now(),
    )
}

/// Title for a saved conversation, taken from its first message.
pub fn generate_chat_title(first_message: Option<&str>) -> String {
    generate_chat_title_with_limit(first_message, TITLE_MAX_LENGTH)
}

pub fn generate_chat_title_with_limit(first_message: Option<&str>, max_length: usize) -> String {
    let text = match first_message {
        Some(text) if !text.trim().is_empty() => text,
        _ => return DEFAULT_TITLE.to_string(),
    };

    match extract_keywords(text).first() {
        Some(keyword) => format!("Chat about {keyword}"),
        None => truncate(text, max_length),
    }
}

/// Whether the text asks the assistant to look at a photo.
pub fn is_image_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    IMAGE_REQUEST_TERMS.iter().any(|term| lower.contains(term))
}

/// Presentation view of a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMessage<'a> {
    pub message: &'a Message,
    pub formatted_time: String,
    pub display_text: &'a str,
}

pub fn format_message(message: &Message, now: DateTime<Utc>) -> DisplayMessage<'_> {
    DisplayMessage {
        message,
        formatted_time: format_relative_time(message.timestamp(), now),
        display_text: message.text(),
    }
}
