use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    records: DashMap<(ChannelId, MessageId), NormalizedMessage>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn upsert(&self, message: &NormalizedMessage) -> Result<(), StoreError> {
        self.records
            .insert((message.channel.clone(), message.id), message.clone());
        Ok(())
    }

    async fn list_channel(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<NormalizedMessage>, StoreError> {
        let mut messages: Vec<_> = self
            .records
            .iter()
            .filter(|entry| &entry.key().0 == channel)
            .map(|entry| entry.value().clone())
            .collect();
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(messages)
    }

    async fn count(&self, channel: &ChannelId) -> Result<u64, StoreError> {
        let count = self
            .records
            .iter()
            .filter(|entry| &entry.key().0 == channel)
            .count();
        Ok(count as u64)
    }
}
