use redis::streams::StreamRangeReply;
use redis::AsyncCommands;

use crate::models::comment::Comment;

/// Prefix for per-recipient comment lists.
const QUEUE_PREFIX: &str = "comments:queue:";

/// Global append-only stream holding an audit copy of every comment.
const LOG_STREAM: &str = "comments:log";

/// Retention for idle queues: 7 days.
const QUEUE_RETENTION_SECS: i64 = 7 * 24 * 3600;

/// Timeout for the multi-key blocking pop, in seconds.
const WAIT_TIMEOUT_SECS: f64 = 5.0;

/// Identifies one per-(source, recipient) FIFO comment queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKey {
    pub source_id: String,
    pub recipient_id: String,
}

impl QueueKey {
    pub fn new(source_id: &str, recipient_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            recipient_id: recipient_id.to_string(),
        }
    }

    /// Full Redis key for this queue.
    pub fn redis_key(&self) -> String {
        format!("{QUEUE_PREFIX}{}:{}", self.source_id, self.recipient_id)
    }

    /// Parse a scanned Redis key back into its components.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(QUEUE_PREFIX)?;
        let (source_id, recipient_id) = rest.split_once(':')?;
        if source_id.is_empty() || recipient_id.is_empty() {
            return None;
        }
        Some(Self::new(source_id, recipient_id))
    }
}

impl std::fmt::Display for QueueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redis_key())
    }
}

/// One entry read back from the global log (audit/replay only).
#[derive(Debug, Clone, serde::Serialize)]
pub struct LogEntry {
    pub position: String,
    pub source_id: String,
    pub recipient_id: String,
    pub timestamp: String,
    pub text: String,
}

/// Redis-backed comment queues plus the global audit log.
///
/// One client per process; both the intake handlers and the worker loops go
/// through multiplexed connections off this client.
pub struct CommentQueue {
    client: redis::Client,
}

impl CommentQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    /// Publish a comment: append to the global log, push onto the recipient's
    /// queue, refresh the queue's retention TTL. Returns the log position and
    /// the queue key, in that order of side effects.
    pub async fn publish(&self, comment: &Comment) -> Result<(String, QueueKey), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;

        let key = QueueKey::new(&comment.source_id, &comment.recipient_id);
        let payload = serde_json::to_string(comment).map_err(QueueError::Serialize)?;

        // Log append first: if this fails the comment is rejected outright.
        let timestamp = comment.timestamp.to_rfc3339();
        let log_position: String = conn
            .xadd(
                LOG_STREAM,
                "*",
                &[
                    ("source_id", comment.source_id.as_str()),
                    ("recipient_id", comment.recipient_id.as_str()),
                    ("timestamp", timestamp.as_str()),
                    ("text", comment.text.as_str()),
                ],
            )
            .await
            .map_err(QueueError::Redis)?;

        conn.rpush::<_, _, ()>(key.redis_key(), &payload)
            .await
            .map_err(QueueError::Redis)?;

        // Idle queues auto-expire after the retention window.
        conn.expire::<_, ()>(key.redis_key(), QUEUE_RETENTION_SECS)
            .await
            .map_err(QueueError::Redis)?;

        Ok((log_position, key))
    }

    /// Enumerate all currently-active queue keys via a cursor-driven prefix
    /// scan. Transient Redis failure degrades to an empty set: the caller
    /// treats that as "nothing to do now", not an error.
    pub async fn list_active_queues(&self) -> Vec<QueueKey> {
        match self.scan_queue_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Queue discovery failed, treating as empty");
                Vec::new()
            }
        }
    }

    async fn scan_queue_keys(&self) -> Result<Vec<QueueKey>, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;

        let pattern = format!("{QUEUE_PREFIX}*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(QueueError::Redis)?;

            keys.extend(batch.iter().filter_map(|k| QueueKey::parse(k)));

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }

    /// Block on the entire discovered key set until any queue has a message
    /// or the wait timeout elapses. Returns the originating key and the raw
    /// payload; the pop is atomic per key, so concurrent workers never see
    /// the same message twice.
    pub async fn wait_for_message(
        &self,
        keys: &[QueueKey],
    ) -> Result<Option<(QueueKey, String)>, QueueError> {
        if keys.is_empty() {
            return Ok(None);
        }

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;

        let redis_keys: Vec<String> = keys.iter().map(QueueKey::redis_key).collect();
        let popped: Option<(String, String)> = conn
            .blpop(redis_keys, WAIT_TIMEOUT_SECS)
            .await
            .map_err(QueueError::Redis)?;

        match popped {
            Some((raw_key, payload)) => {
                let key = QueueKey::parse(&raw_key).ok_or(QueueError::MalformedKey(raw_key))?;
                Ok(Some((key, payload)))
            }
            None => Ok(None),
        }
    }

    /// Read every remaining entry of a queue without removing them. Deletion
    /// happens separately once the batch outcome has been produced.
    pub async fn peek_all(&self, key: &QueueKey) -> Result<Vec<String>, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let entries: Vec<String> = conn
            .lrange(key.redis_key(), 0, -1)
            .await
            .map_err(QueueError::Redis)?;
        Ok(entries)
    }

    /// Delete a queue in full (batch processed, drain-once-decide-once).
    pub async fn delete(&self, key: &QueueKey) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        conn.del::<_, ()>(key.redis_key())
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Current queue depth for one key.
    pub async fn len(&self, key: &QueueKey) -> Result<u64, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let len: u64 = conn
            .llen(key.redis_key())
            .await
            .map_err(QueueError::Redis)?;
        Ok(len)
    }

    /// Remaining retention TTL of a queue in seconds (-1 if unset, -2 if gone).
    pub async fn ttl(&self, key: &QueueKey) -> Result<i64, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let ttl: i64 = conn.ttl(key.redis_key()).await.map_err(QueueError::Redis)?;
        Ok(ttl)
    }

    /// Bounded range read over the global log, oldest first.
    pub async fn read_log(&self, count: usize) -> Result<Vec<LogEntry>, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;

        let reply: StreamRangeReply = conn
            .xrange_count(LOG_STREAM, "-", "+", count)
            .await
            .map_err(QueueError::Redis)?;

        let entries = reply
            .ids
            .into_iter()
            .map(|entry| LogEntry {
                source_id: entry.get("source_id").unwrap_or_default(),
                recipient_id: entry.get("recipient_id").unwrap_or_default(),
                timestamp: entry.get("timestamp").unwrap_or_default(),
                text: entry.get("text").unwrap_or_default(),
                position: entry.id,
            })
            .collect();

        Ok(entries)
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Queue retention window, exposed for tests and status reporting.
    pub fn retention_secs() -> i64 {
        QUEUE_RETENTION_SECS
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Popped entry carried an unrecognized queue key: {0}")]
    MalformedKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_key_roundtrip() {
        let key = QueueKey::new("s1", "r1");
        assert_eq!(key.redis_key(), "comments:queue:s1:r1");
        assert_eq!(QueueKey::parse(&key.redis_key()), Some(key));
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert_eq!(QueueKey::parse("other:prefix:s1:r1"), None);
        assert_eq!(QueueKey::parse("comments:queue:"), None);
        assert_eq!(QueueKey::parse("comments:queue:only-source"), None);
    }

    #[test]
    fn test_parse_keeps_colons_in_recipient() {
        // Only the first separator splits; recipient handles may contain ':'.
        let key = QueueKey::parse("comments:queue:s1:r:1").unwrap();
        assert_eq!(key.source_id, "s1");
        assert_eq!(key.recipient_id, "r:1");
    }
}
