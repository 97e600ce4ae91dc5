use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Extra fields carried into the persisted record. Everything else,
/// including `media`, is dropped.
pub const RETAINED_FIELDS: &[&str] = &[
    "reply_to",
    "fwd_from",
    "views",
    "forwards",
    "replies",
    "post_author",
    "grouped_id",
    "pinned",
    "edit_hide",
];

pub const MAX_FIELD_BYTES: usize = 4 * 1024;

const PEER_KEYS: [&str; 3] = ["user_id", "channel_id", "chat_id"];

pub fn normalize(channel: &ChannelId, raw: RawMessage) -> NormalizedMessage {
    let RawMessage {
        id,
        date,
        edit_date,
        sender_id,
        from_id,
        text,
        message,
        media: _,
        extra,
    } = raw;

    NormalizedMessage {
        channel: channel.clone(),
        id,
        timestamp: format_timestamp(date),
        edited_at: edit_date.map(format_timestamp),
        sender_id: sender_id
            .as_ref()
            .and_then(sender_key)
            .or_else(|| from_id.as_ref().and_then(sender_key)),
        text: text.or(message).unwrap_or_default(),
        extra: project_fields(extra),
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn project_fields(extra: Map<String, Value>) -> Map<String, Value> {
    extra
        .into_iter()
        .filter(|(key, _)| RETAINED_FIELDS.contains(&key.as_str()))
        .filter(|(_, value)| value.to_string().len() <= MAX_FIELD_BYTES)
        .collect()
}

fn sender_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(peer) => PEER_KEYS
            .iter()
            .find_map(|key| peer.get(*key))
            .and_then(sender_key),
        _ => None,
    }
}
