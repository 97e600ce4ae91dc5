use crate::domain_model::ChannelId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Canonical string form for persisted timestamps (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct MessageId(pub i64);

impl FromStr for MessageId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<i64>().map_err(|e| e.to_string())?;
        Ok(Self(id))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub edit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sender_id: Option<Value>,
    /// Peer object some sources send next to, or instead of, `sender_id`.
    #[serde(default)]
    pub from_id: Option<Value>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub media: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawMessage {
    pub fn new(id: MessageId, date: DateTime<Utc>) -> Self {
        Self {
            id,
            date,
            edit_date: None,
            sender_id: None,
            from_id: None,
            text: None,
            message: None,
            media: None,
            extra: Map::new(),
        }
    }

    pub fn with_sender(mut self, sender_id: impl Into<Value>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_media(mut self, media: Value) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub channel: ChannelId,
    pub id: MessageId,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl NormalizedMessage {
    pub fn sent_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }

    pub fn sent_on(&self) -> Option<NaiveDate> {
        self.sent_at().map(|at| at.date())
    }
}
