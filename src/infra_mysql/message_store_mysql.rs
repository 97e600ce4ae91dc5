use crate::domain_model::*;
use crate::domain_port::*;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::types::JsonValue;
use sqlx::{MySqlPool, Row};

const CHANNEL_MESSAGES_SCHEMA: &str = include_str!("channel_messages.sql");

pub struct MySqlMessageStore {
    pool: MySqlPool,
}

impl MySqlMessageStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlMessageStore { pool }
    }

    pub async fn connect(dsn: &str) -> Result<Self, StoreError> {
        let pool = MySqlPool::connect(dsn)
            .await
            .map_err(|e| StoreError::Store(format!("mysql connect: {e}")))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CHANNEL_MESSAGES_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Store(format!("create schema: {e}")))?;
        Ok(())
    }

    fn row_to_message(r: &MySqlRow) -> Result<NormalizedMessage, StoreError> {
        let decode = |e: sqlx::Error| StoreError::Store(format!("row decode: {e}"));
        let extra = match r.try_get::<JsonValue, _>("extra_json").map_err(decode)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Ok(NormalizedMessage {
            channel: r.try_get::<ChannelId, _>("channel").map_err(decode)?,
            id: r.try_get::<MessageId, _>("message_id").map_err(decode)?,
            timestamp: r.try_get::<String, _>("sent_at").map_err(decode)?,
            edited_at: r.try_get::<Option<String>, _>("edited_at").map_err(decode)?,
            sender_id: r.try_get::<Option<String>, _>("sender_id").map_err(decode)?,
            text: r.try_get::<String, _>("text").map_err(decode)?,
            extra,
        })
    }
}

#[async_trait::async_trait]
impl MessageStore for MySqlMessageStore {
    async fn upsert(&self, message: &NormalizedMessage) -> Result<(), StoreError> {
        sqlx::query(
            r#"
INSERT INTO channel_messages (channel, message_id, sent_at, edited_at, sender_id, text, extra_json)
VALUES (?, ?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    sent_at = VALUES(sent_at),
    edited_at = VALUES(edited_at),
    sender_id = VALUES(sender_id),
    text = VALUES(text),
    extra_json = VALUES(extra_json)
"#,
        )
        .bind(&message.channel)
        .bind(message.id)
        .bind(&message.timestamp)
        .bind(&message.edited_at)
        .bind(&message.sender_id)
        .bind(&message.text)
        .bind(Value::Object(message.extra.clone()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Store(format!("upsert message {}: {e}", message.id)))?;

        Ok(())
    }

    async fn list_channel(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<NormalizedMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT channel, message_id, sent_at, edited_at, sender_id, text, extra_json
FROM channel_messages
WHERE channel = ?
ORDER BY message_id DESC
"#,
        )
        .bind(channel)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Store(format!("list channel: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn count(&self, channel: &ChannelId) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM channel_messages WHERE channel = ?")
                .bind(channel)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::Store(format!("count: {e}")))?;
        Ok(count.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
