use crate::domain_model::*;
use crate::domain_port::*;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

// `%` itself is escaped, so no two channels share a file.
const FILE_STEM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

enum TailRepair {
    Truncate(u64),
    Terminate,
}

struct ChannelLog {
    path: PathBuf,
    file: File,
    index: HashMap<MessageId, NormalizedMessage>,
}

/// Flat-file store: one JSON-lines file per channel.
pub struct JsonlMessageStore {
    dir: PathBuf,
    channels: Mutex<HashMap<ChannelId, ChannelLog>>,
}

impl JsonlMessageStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self {
            dir,
            channels: Mutex::new(HashMap::new()),
        })
    }

    pub fn channel_path(&self, channel: &ChannelId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", file_stem(channel)))
    }

    async fn log_for<'a>(
        &self,
        channels: &'a mut HashMap<ChannelId, ChannelLog>,
        channel: &ChannelId,
    ) -> Result<&'a mut ChannelLog, StoreError> {
        match channels.entry(channel.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let log = open_log(channel, self.channel_path(channel)).await?;
                Ok(entry.insert(log))
            }
        }
    }
}

fn file_stem(channel: &ChannelId) -> String {
    if channel.as_str().is_empty() {
        // never produced by the encoding, which only emits `%XX`
        return "%".to_string();
    }
    utf8_percent_encode(channel.as_str(), FILE_STEM).to_string()
}

async fn open_log(channel: &ChannelId, path: PathBuf) -> Result<ChannelLog, StoreError> {
    let (index, repair) = load_index(channel, &path).await?;
    let io_err = |source| StoreError::Io {
        path: path.clone(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(io_err)?;
    match repair {
        Some(TailRepair::Truncate(len)) => file.set_len(len).await.map_err(io_err)?,
        Some(TailRepair::Terminate) => file.write_all(b"\n").await.map_err(io_err)?,
        None => {}
    }
    debug!(path = %path.display(), records = index.len(), "channel log opened");

    Ok(ChannelLog { path, file, index })
}

async fn load_index(
    channel: &ChannelId,
    path: &Path,
) -> Result<(HashMap<MessageId, NormalizedMessage>, Option<TailRepair>), StoreError> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((HashMap::new(), None)),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let torn_tail = !contents.is_empty() && !contents.ends_with('\n');
    let lines: Vec<&str> = contents.lines().collect();
    let mut index = HashMap::new();
    let mut dropped_tail = false;

    for (n, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<NormalizedMessage>(line) {
            Ok(message) if &message.channel == channel => {
                index.insert(message.id, message);
            }
            Ok(message) => {
                warn!(
                    path = %path.display(),
                    line = n + 1,
                    found = %message.channel,
                    "skipping record of another channel"
                );
            }
            Err(e) if torn_tail && n + 1 == lines.len() => {
                warn!(path = %path.display(), line = n + 1, error = %e, "ignoring torn final record");
                dropped_tail = true;
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: n + 1,
                    reason: e.to_string(),
                });
            }
        }
    }

    let repair = if dropped_tail {
        let intact_len = contents.rfind('\n').map_or(0, |i| i + 1);
        Some(TailRepair::Truncate(intact_len as u64))
    } else if torn_tail {
        Some(TailRepair::Terminate)
    } else {
        None
    };
    Ok((index, repair))
}

#[async_trait::async_trait]
impl MessageStore for JsonlMessageStore {
    async fn upsert(&self, message: &NormalizedMessage) -> Result<(), StoreError> {
        let mut channels = self.channels.lock().await;
        let log = self.log_for(&mut channels, &message.channel).await?;

        if log.index.get(&message.id) == Some(message) {
            return Ok(());
        }

        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        log.file
            .write_all(&line)
            .await
            .map_err(|source| StoreError::Io {
                path: log.path.clone(),
                source,
            })?;
        log.file.flush().await.map_err(|source| StoreError::Io {
            path: log.path.clone(),
            source,
        })?;

        log.index.insert(message.id, message.clone());
        Ok(())
    }

    async fn list_channel(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<NormalizedMessage>, StoreError> {
        let mut channels = self.channels.lock().await;
        let log = self.log_for(&mut channels, channel).await?;
        let mut messages: Vec<_> = log.index.values().cloned().collect();
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(messages)
    }

    async fn count(&self, channel: &ChannelId) -> Result<u64, StoreError> {
        let mut channels = self.channels.lock().await;
        let log = self.log_for(&mut channels, channel).await?;
        Ok(log.index.len() as u64)
    }

    async fn close(&self) {
        let mut channels = self.channels.lock().await;
        for (channel, log) in channels.iter_mut() {
            if let Err(e) = log.file.sync_all().await {
                warn!(%channel, error = %e, "failed to sync channel log");
            }
        }
        channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use tempfile::tempdir;

    fn message(channel: &str, id: i64, text: &str) -> NormalizedMessage {
        NormalizedMessage {
            channel: ChannelId::from(channel),
            id: MessageId(id),
            timestamp: "2024_09_27_10_00_00".to_string(),
            edited_at: None,
            sender_id: Some("42".to_string()),
            text: text.to_string(),
            extra: Map::new(),
        }
    }

    async fn line_count(path: &Path) -> usize {
        tokio::fs::read_to_string(path).await.unwrap().lines().count()
    }

    #[tokio::test]
    async fn identical_upsert_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = JsonlMessageStore::open(dir.path()).await.unwrap();
        let channel = ChannelId::from("pal");

        store.upsert(&message("pal", 1, "hello")).await.unwrap();
        store.upsert(&message("pal", 1, "hello")).await.unwrap();

        assert_eq!(store.count(&channel).await.unwrap(), 1);
        assert_eq!(line_count(&store.channel_path(&channel)).await, 1);
    }

    #[tokio::test]
    async fn changed_record_is_appended_and_wins_on_reload() {
        let dir = tempdir().unwrap();
        let channel = ChannelId::from("pal");
        {
            let store = JsonlMessageStore::open(dir.path()).await.unwrap();
            store.upsert(&message("pal", 1, "hello")).await.unwrap();
            store.upsert(&message("pal", 2, "world")).await.unwrap();
            store.upsert(&message("pal", 1, "hello, edited")).await.unwrap();
            store.close().await;
        }

        let reopened = JsonlMessageStore::open(dir.path()).await.unwrap();
        let stored = reopened.list_channel(&channel).await.unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].id, MessageId(2));
        assert_eq!(stored[1].text, "hello, edited");
        assert_eq!(line_count(&reopened.channel_path(&channel)).await, 3);
    }

    #[tokio::test]
    async fn torn_final_line_is_ignored_and_repaired() {
        let dir = tempdir().unwrap();
        let channel = ChannelId::from("pal");
        let store = JsonlMessageStore::open(dir.path()).await.unwrap();
        let path = store.channel_path(&channel);
        let intact = serde_json::to_string(&message("pal", 1, "hello")).unwrap();
        tokio::fs::write(&path, format!("{intact}\n{{\"channel\":\"pal\",\"id\":2,"))
            .await
            .unwrap();

        store.upsert(&message("pal", 3, "after crash")).await.unwrap();
        store.close().await;

        let reopened = JsonlMessageStore::open(dir.path()).await.unwrap();
        let ids: Vec<_> = reopened
            .list_channel(&channel)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id.0)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn corrupt_inner_line_is_reported() {
        let dir = tempdir().unwrap();
        let channel = ChannelId::from("pal");
        let store = JsonlMessageStore::open(dir.path()).await.unwrap();
        let intact = serde_json::to_string(&message("pal", 1, "hello")).unwrap();
        tokio::fs::write(store.channel_path(&channel), format!("not json\n{intact}\n"))
            .await
            .unwrap();

        let result = store.count(&channel).await;

        assert!(matches!(result, Err(StoreError::Corrupt { line: 1, .. })));
    }

    #[tokio::test]
    async fn channels_get_separate_encoded_files() {
        let dir = tempdir().unwrap();
        let store = JsonlMessageStore::open(dir.path()).await.unwrap();

        let msg_a = message("news/daily", 1, "a");
        let msg_b = message("chat", 1, "b");
        let (a, b) = tokio::join!(store.upsert(&msg_a), store.upsert(&msg_b));
        a.unwrap();
        b.unwrap();

        assert!(dir.path().join("news%2Fdaily.jsonl").exists());
        assert!(dir.path().join("chat.jsonl").exists());
        assert_eq!(
            store.count(&ChannelId::from("news/daily")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn similar_channel_names_keep_their_own_history() {
        let dir = tempdir().unwrap();
        {
            let store = JsonlMessageStore::open(dir.path()).await.unwrap();
            store.upsert(&message("news/daily", 1, "from slash channel")).await.unwrap();
            store.upsert(&message("news_daily", 1, "from underscore channel")).await.unwrap();
            store.upsert(&message("news_daily", 2, "only underscore")).await.unwrap();
            store.upsert(&message("news daily", 7, "from space channel")).await.unwrap();
            store.close().await;
        }

        let reopened = JsonlMessageStore::open(dir.path()).await.unwrap();
        let slash = reopened.list_channel(&ChannelId::from("news/daily")).await.unwrap();
        let underscore = reopened.list_channel(&ChannelId::from("news_daily")).await.unwrap();
        let space = reopened.list_channel(&ChannelId::from("news daily")).await.unwrap();

        assert_eq!(slash.len(), 1);
        assert_eq!(slash[0].text, "from slash channel");
        let ids: Vec<_> = underscore.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(underscore.iter().all(|m| m.channel == ChannelId::from("news_daily")));
        assert_eq!(space.len(), 1);
        assert_eq!(space[0].id, MessageId(7));
    }

    #[tokio::test]
    async fn records_of_another_channel_in_a_file_are_skipped() {
        let dir = tempdir().unwrap();
        let store = JsonlMessageStore::open(dir.path()).await.unwrap();
        let channel = ChannelId::from("pal");
        let own = serde_json::to_string(&message("pal", 1, "mine")).unwrap();
        let foreign = serde_json::to_string(&message("other", 2, "not mine")).unwrap();
        tokio::fs::write(store.channel_path(&channel), format!("{own}\n{foreign}\n"))
            .await
            .unwrap();

        let stored = store.list_channel(&channel).await.unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "mine");
    }

    #[test]
    fn file_stems_are_distinct_per_channel() {
        assert_eq!(file_stem(&ChannelId::from("pal_Online9")), "pal_Online9");
        assert_eq!(file_stem(&ChannelId::from("news/daily")), "news%2Fdaily");
        assert_eq!(file_stem(&ChannelId::from("news daily")), "news%20daily");
        assert_eq!(file_stem(&ChannelId::from("50%")), "50%25");
        assert_eq!(file_stem(&ChannelId::from("..")), "%2E%2E");
        assert_eq!(file_stem(&ChannelId::from("")), "%");
    }
}
