use serde_json::{Map, Value};

use crate::models::ParsedReply;

/// Splits an assistant reply into readable text and an embedded JSON object.
///
/// The candidate object is the greedy span from the leftmost `{` to the
/// rightmost `}`. Replies with several independent objects, or stray braces in
/// prose such as "{see below}", will therefore capture more than the payload and
/// usually fail to decode. Any decode failure yields the raw reply unchanged.
pub fn parse_bot_response(raw: &str) -> ParsedReply {
    match extract_structured_span(raw) {
        Some((start, end)) => {
            let span = &raw[start..end];
            match serde_json::from_str::<Map<String, Value>>(span) {
                Ok(data) => {
                    let mut text = String::with_capacity(raw.len() - span.len());
                    text.push_str(&raw[..start]);
                    text.push_str(&raw[end..]);
                    ParsedReply {
                        text: text.trim().to_string(),
                        structured_data: Some(data),
                    }
                }
                Err(e) => {
                    tracing::debug!("Reply contains braces but no decodable object: {}", e);
                    plain(raw)
                }
            }
        }
        None => plain(raw),
    }
}

/// Byte range of the leftmost `{` through the rightmost `}`, if the latter follows the former.
fn extract_structured_span(raw: &str) -> Option<(usize, usize)> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then_some((start, end + 1))
}

fn plain(raw: &str) -> ParsedReply {
    ParsedReply {
        text: raw.to_string(),
        structured_data: None,
    }
}
