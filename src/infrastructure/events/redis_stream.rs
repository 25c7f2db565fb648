use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamRangeReply};
use redis::Client;
use tracing::error;

use crate::domain::event::{DomainEvent, EventId, EventStream, EventType, StreamEntry};
use crate::domain::DomainError;

/// Redis Streams log
///
/// Each event is one `XADD` entry with the fields `event_id`, `event_type`,
/// `partition_key`, `payload` and `emitted_at`.
#[derive(Clone)]
pub struct RedisEventStream {
    connection: ConnectionManager,
    stream_key: String,
    max_len: usize,
}

impl fmt::Debug for RedisEventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisEventStream")
            .field("stream_key", &self.stream_key)
            .field("max_len", &self.max_len)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisEventStream {
    pub async fn connect(
        url: &str,
        stream_key: impl Into<String>,
        max_len: usize,
    ) -> Result<Self, DomainError> {
        let client = Client::open(url)
            .map_err(|e| DomainError::configuration(format!("Invalid Redis URL: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            stream_key: stream_key.into(),
            max_len,
        })
    }
}

fn field<T: redis::FromRedisValue>(entry: &StreamId, name: &str) -> Result<T, DomainError> {
    entry.get(name).ok_or_else(|| {
        DomainError::storage(format!(
            "Stream entry '{}' is missing field '{}'",
            entry.id, name
        ))
    })
}

fn decode_entry(entry: &StreamId) -> Result<StreamEntry, DomainError> {
    let event_type: String = field(entry, "event_type")?;
    let payload: String = field(entry, "payload")?;
    let emitted_at: String = field(entry, "emitted_at")?;

    let event = DomainEvent {
        id: EventId::new(field::<String>(entry, "event_id")?),
        event_type: event_type.parse::<EventType>()?,
        partition_key: field(entry, "partition_key")?,
        payload: serde_json::from_str(&payload).map_err(|e| {
            DomainError::storage(format!("Invalid payload in entry '{}': {}", entry.id, e))
        })?,
        emitted_at: DateTime::parse_from_rfc3339(&emitted_at)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| {
                DomainError::storage(format!("Invalid emitted_at in entry '{}': {}", entry.id, e))
            })?,
    };

    Ok(StreamEntry {
        entry_id: entry.id.clone(),
        event,
    })
}

/// Decodes a batch, dropping entries that cannot be decoded
fn decode_batch(stream_key: &str, ids: &[StreamId]) -> Vec<StreamEntry> {
    ids.iter()
        .filter_map(|entry| match decode_entry(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                error!(
                    stream = %stream_key,
                    entry_id = %entry.id,
                    error = %e,
                    "Skipping undecodable stream entry"
                );
                None
            }
        })
        .collect()
}

impl RedisEventStream {
    async fn range(&self, start: &str, limit: usize) -> Result<StreamRangeReply, DomainError> {
        let mut conn = self.connection.clone();

        redis::cmd("XRANGE")
            .arg(&self.stream_key)
            .arg(start)
            .arg("+")
            .arg("COUNT")
            .arg(limit)
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::storage(format!("XRANGE failed: {}", e)))
    }
}

#[async_trait]
impl EventStream for RedisEventStream {
    async fn append(&self, event: &DomainEvent) -> Result<String, DomainError> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(&event.payload)
            .map_err(|e| DomainError::internal(format!("Failed to encode payload: {}", e)))?;

        redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg("event_id")
            .arg(event.id.as_str())
            .arg("event_type")
            .arg(event.event_type.as_str())
            .arg("partition_key")
            .arg(&event.partition_key)
            .arg("payload")
            .arg(payload)
            .arg("emitted_at")
            .arg(event.emitted_at.to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::event_publish(event.id.as_str(), format!("XADD failed: {}", e)))
    }

    async fn read_after(
        &self,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StreamEntry>, DomainError> {
        let mut start = cursor.map_or_else(|| "-".to_string(), |id| format!("({}", id));

        // a batch of only undecodable entries must not stall the consumer
        loop {
            let reply = self.range(&start, limit).await?;

            let Some(last) = reply.ids.last() else {
                return Ok(Vec::new());
            };

            let entries = decode_batch(&self.stream_key, &reply.ids);
            if !entries.is_empty() {
                return Ok(entries);
            }

            start = format!("({}", last.id);
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
