use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Incoming live-stream comment as posted to the intake endpoint.
///
/// `source_id` is the broadcaster the comment was seen on; `recipient_id` is
/// the viewer/client the per-recipient queue is keyed on. Neither needs to be
/// registered anywhere — they are platform handles.
#[derive(Debug, Deserialize, Validate)]
pub struct IncomingComment {
    #[garde(length(min = 1, max = 255))]
    pub source_id: String,

    #[garde(length(min = 1, max = 255))]
    pub recipient_id: String,

    /// ISO-8601; server-assigned when absent.
    #[garde(skip)]
    pub timestamp: Option<DateTime<Utc>>,

    #[garde(length(min = 1, max = 2000), custom(not_blank))]
    pub text: String,
}

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("cannot be empty or whitespace only"));
    }
    Ok(())
}

/// Immutable comment as serialized into the queue and the global log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub source_id: String,
    pub recipient_id: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl Comment {
    /// Build the queued form, trimming the text and assigning the server
    /// timestamp when the caller did not provide one.
    pub fn from_incoming(incoming: IncomingComment) -> Self {
        Self {
            source_id: incoming.source_id,
            recipient_id: incoming.recipient_id,
            timestamp: incoming.timestamp.unwrap_or_else(Utc::now),
            text: incoming.text.trim().to_string(),
        }
    }
}

/// Response after accepting a comment into the log and queue.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    pub queue_key: String,
    /// Entry id assigned by the global log (monotonically ordered).
    pub log_position: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(text: &str) -> IncomingComment {
        IncomingComment {
            source_id: "s1".to_string(),
            recipient_id: "r1".to_string(),
            timestamp: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_valid_comment_passes() {
        assert!(incoming("I want to buy this now!").validate().is_ok());
    }

    #[test]
    fn test_whitespace_only_text_rejected() {
        assert!(incoming("   \t ").validate().is_err());
    }

    #[test]
    fn test_empty_source_rejected() {
        let mut c = incoming("hello");
        c.source_id = String::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_server_assigns_timestamp_when_absent() {
        let before = Utc::now();
        let comment = Comment::from_incoming(incoming("  hola  "));
        assert!(comment.timestamp >= before);
        assert_eq!(comment.text, "hola");
    }
}
