//! Typed records persisted through the document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A logical grouping of transcripts and a conversation over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(title: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            user_id: user_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Where a transcript's text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptSource {
    /// Text supplied directly.
    Text,
    /// Transcribed from an uploaded audio/video file.
    Upload { filename: String },
    /// Transcribed from a YouTube video.
    Youtube { url: String },
}

impl TranscriptSource {
    pub fn label(&self) -> &'static str {
        match self {
            TranscriptSource::Text => "text",
            TranscriptSource::Upload { .. } => "upload",
            TranscriptSource::Youtube { .. } => "youtube",
        }
    }
}

/// A transcript belonging to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub title: String,
    pub original_text: String,
    pub source: TranscriptSource,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTranscript {
    pub session_id: String,
    pub user_id: String,
    pub title: String,
    pub original_text: String,
    pub source: TranscriptSource,
}

impl NewTranscript {
    /// A transcript whose text was supplied directly.
    pub fn text(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        original_text: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            title: title.into(),
            original_text: original_text.into(),
            source: TranscriptSource::Text,
        }
    }

    pub fn into_transcript(self) -> Transcript {
        Transcript {
            id: new_id(),
            session_id: self.session_id,
            user_id: self.user_id,
            title: self.title,
            original_text: self.original_text,
            source: self.source,
            created_at: Utc::now(),
        }
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "assistant" | "ai" | "bot" => Ok(Sender::Assistant),
            other => Err(format!("Unknown sender: {}", other)),
        }
    }
}

/// A message in a session's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(session_id: impl Into<String>, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            session_id: session_id.into(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Metadata pointing at a session's serialized vector index.
///
/// `transcript_count` is the number of transcripts the session had when the
/// blob at `blob_key` was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexCacheRecord {
    pub id: String,
    pub session_id: String,
    pub blob_key: String,
    pub transcript_count: usize,
    pub dimensions: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexCacheRecord {
    pub fn new(
        session_id: impl Into<String>,
        blob_key: impl Into<String>,
        transcript_count: usize,
        dimensions: usize,
    ) -> Self {
        Self {
            id: new_id(),
            session_id: session_id.into(),
            blob_key: blob_key.into(),
            transcript_count,
            dimensions,
            built_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::to_fields;

    #[test]
    fn test_transcript_source_serialization() {
        let upload = TranscriptSource::Upload {
            filename: "lecture.mp3".into(),
        };
        let json = serde_json::to_value(&upload).unwrap();
        assert_eq!(json["kind"], "upload");
        assert_eq!(json["filename"], "lecture.mp3");

        let text: TranscriptSource = serde_json::from_value(serde_json::json!({"kind": "text"})).unwrap();
        assert_eq!(text, TranscriptSource::Text);
    }

    #[test]
    fn test_sender_parsing() {
        assert_eq!("User".parse::<Sender>().unwrap(), Sender::User);
        assert_eq!("ai".parse::<Sender>().unwrap(), Sender::Assistant);
        assert!("robot".parse::<Sender>().is_err());
        assert_eq!(serde_json::to_value(Sender::Assistant).unwrap(), "assistant");
    }

    #[test]
    fn test_records_round_trip_through_fields() {
        let record = IndexCacheRecord::new("s1", "s1-abc.vidx", 2, 384);
        let fields = to_fields(&record).unwrap();
        assert_eq!(fields["session_id"], "s1");
        assert_eq!(fields["transcript_count"], 2);

        let back: IndexCacheRecord =
            serde_json::from_value(serde_json::Value::Object(fields)).unwrap();
        assert_eq!(back, record);
    }
}
