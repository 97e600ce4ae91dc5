use crate::domain_model::*;
use crate::domain_port::*;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document, doc};
use mongodb::options::{ClientOptions, FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};

/// Document store: one collection for all channels, one document per
/// `(channel, id)` behind a unique index.
pub struct MongoMessageStore {
    collection: Collection<Document>,
    client: Client,
}

impl MongoMessageStore {
    pub async fn connect(dsn: &str, database: &str, collection: &str) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(dsn)
            .await
            .map_err(|e| StoreError::Store(format!("mongo options: {e}")))?;
        let client = Client::with_options(options)
            .map_err(|e| StoreError::Store(format!("mongo connect: {e}")))?;
        let collection = client.database(database).collection::<Document>(collection);

        let store = Self { collection, client };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let key_index = IndexModel::builder()
            .keys(doc! {"channel": 1, "id": -1})
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(Some("uid_channel_message".to_string()))
                    .build(),
            )
            .build();
        self.collection
            .create_index(key_index, None::<mongodb::options::CreateIndexOptions>)
            .await
            .map_err(|e| StoreError::Store(format!("create index: {e}")))?;
        Ok(())
    }
}

fn record_key(channel: &ChannelId, id: MessageId) -> Document {
    doc! {"channel": channel.as_str(), "id": id.0}
}

fn to_record(message: &NormalizedMessage) -> Result<Document, StoreError> {
    bson::to_document(message).map_err(|e| StoreError::Store(format!("encode message {}: {e}", message.id)))
}

fn from_record(mut record: Document) -> Result<NormalizedMessage, StoreError> {
    record.remove("_id");
    bson::from_document(record).map_err(|e| StoreError::Store(format!("decode message: {e}")))
}

#[async_trait::async_trait]
impl MessageStore for MongoMessageStore {
    async fn upsert(&self, message: &NormalizedMessage) -> Result<(), StoreError> {
        let filter = record_key(&message.channel, message.id);
        let record = to_record(message)?;
        let update = doc! {"$set": record};
        let options = UpdateOptions::builder().upsert(true).build();

        self.collection
            .update_one(filter, update, options)
            .await
            .map_err(|e| StoreError::Store(format!("upsert message {}: {e}", message.id)))?;
        Ok(())
    }

    async fn list_channel(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<NormalizedMessage>, StoreError> {
        let options = FindOptions::builder().sort(doc! {"id": -1}).build();
        let records: Vec<Document> = self
            .collection
            .find(doc! {"channel": channel.as_str()}, options)
            .await
            .map_err(|e| StoreError::Store(format!("list channel: {e}")))?
            .try_collect()
            .await
            .map_err(|e| StoreError::Store(format!("list channel: {e}")))?;

        records.into_iter().map(from_record).collect()
    }

    async fn count(&self, channel: &ChannelId) -> Result<u64, StoreError> {
        self.collection
            .count_documents(doc! {"channel": channel.as_str()}, None)
            .await
            .map_err(|e| StoreError::Store(format!("count: {e}")))
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}
