use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisWrite, ToRedisArgs};

/// One hash per channel: field = message id, value = JSON record.
pub struct RedisMessageStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisMessageStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisMessageStore {
            conn,
            prefix: prefix.into(),
        }
    }

    pub async fn connect(dsn: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(dsn).map_err(|e| StoreError::Store(format!("redis open: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Store(format!("redis connect: {e}")))?;
        Ok(Self::new(conn, prefix))
    }

    pub fn key(&self, channel: &ChannelId) -> String {
        format!("{}:{}", self.prefix, channel)
    }
}

impl ToRedisArgs for MessageId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.0.to_string().as_bytes())
    }
}

#[async_trait::async_trait]
impl MessageStore for RedisMessageStore {
    async fn upsert(&self, message: &NormalizedMessage) -> Result<(), StoreError> {
        let key = self.key(&message.channel);
        let record = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset(&key, message.id, record)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn list_channel(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<NormalizedMessage>, StoreError> {
        let key = self.key(channel);
        let mut conn = self.conn.clone();
        let records: Vec<String> = conn
            .hvals(&key)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;

        let mut messages = records
            .iter()
            .map(|r| serde_json::from_str::<NormalizedMessage>(r))
            .collect::<Result<Vec<_>, _>>()?;
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(messages)
    }

    async fn count(&self, channel: &ChannelId) -> Result<u64, StoreError> {
        let key = self.key(channel);
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .hlen(&key)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        Ok(count)
    }
}
