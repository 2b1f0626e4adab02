//! Redis-backed [`KvStore`].

use crate::script::{parse_reply, DECREMENT_SCRIPT};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ErrorKind, RedisError, Script};
use storefront_core::stock::{AtomicDecrement, CounterDecrement};
use storefront_core::{KvStore, Result, ShopError};

/// `Redis` key-value store.
///
/// Cloning is cheap; clones share the connection manager.
///
/// # Example
///
/// ```no_run
/// use storefront_redis::RedisKvStore;
/// use storefront_core::KvStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let kv = RedisKvStore::new("redis://127.0.0.1:6379").await?;
/// let stock = kv.get("stock:ring").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisKvStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    decrement: Script,
}

impl std::fmt::Debug for RedisKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvStore").finish_non_exhaustive()
    }
}

impl RedisKvStore {
    /// Connect to `Redis`.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`] if the URL is invalid or the connection
    /// fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| ShopError::Kv(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            ShopError::Kv(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self {
            conn_manager,
            decrement: Script::new(DECREMENT_SCRIPT),
        })
    }

    /// Round-trip a `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Kv`] if `Redis` does not answer.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| kv_error("ping", &e))?;
        Ok(())
    }
}

fn kv_error(operation: &str, error: &RedisError) -> ShopError {
    ShopError::Kv(format!("Redis {operation} failed: {error}"))
}

/// Scripting disabled or unsupported by the server.
fn script_error(error: &RedisError) -> ShopError {
    let unsupported = error.kind() == ErrorKind::NoScriptError
        || error.to_string().contains("unknown command");
    if unsupported {
        ShopError::ScriptUnavailable
    } else {
        kv_error("decrement script", error)
    }
}

impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn_manager.clone();
        conn.get(key).await.map_err(|e| kv_error("GET", &e))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.set(key, value).await.map_err(|e| kv_error("SET", &e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.del(key).await.map_err(|e| kv_error("DEL", &e))?;
        Ok(())
    }

    async fn lpush(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let _: () = conn.lpush(key, value).await.map_err(|e| kv_error("LPUSH", &e))?;
        Ok(())
    }

    async fn rpush(&self, key: &str, values: Vec<String>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn_manager.clone();
        let _: () = conn.rpush(key, values).await.map_err(|e| kv_error("RPUSH", &e))?;
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        conn.lrange(key, start, stop)
            .await
            .map_err(|e| kv_error("LRANGE", &e))
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn_manager.clone();
        conn.incr(key, delta).await.map_err(|e| kv_error("INCRBY", &e))
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        let _: () = conn
            .expire(key, seconds)
            .await
            .map_err(|e| kv_error("EXPIRE", &e))?;
        Ok(())
    }

    async fn atomic_decrement(&self, counters: &[CounterDecrement]) -> Result<AtomicDecrement> {
        let mut conn = self.conn_manager.clone();
        let mut invocation = self.decrement.prepare_invoke();
        for counter in counters {
            invocation.key(&counter.key).arg(counter.quantity);
        }

        let reply: Vec<i64> = invocation.invoke_async(&mut conn).await.map_err(|e| {
            tracing::warn!(error = %e, counters = counters.len(), "Decrement script failed");
            script_error(&e)
        })?;

        parse_reply(&reply, counters.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::stock::{CounterStep, PlanShortfall};

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    fn test_key(name: &str) -> String {
        format!("test:{name}:{}", uuid::Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_get_set_delete() {
        let kv = RedisKvStore::new("redis://127.0.0.1:6379").await.unwrap();
        let key = test_key("value");

        assert_eq!(kv.get(&key).await.unwrap(), None);
        kv.set(&key, "{\"a\":1}".into()).await.unwrap();
        assert_eq!(kv.get(&key).await.unwrap().as_deref(), Some("{\"a\":1}"));

        // Cleanup
        kv.delete(&key).await.unwrap();
        assert_eq!(kv.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_lists_keep_push_order() {
        let kv = RedisKvStore::new("redis://127.0.0.1:6379").await.unwrap();
        let key = test_key("list");

        kv.rpush(&key, vec!["a".into(), "b".into()]).await.unwrap();
        kv.lpush(&key, "z".into()).await.unwrap();
        assert_eq!(kv.lrange(&key, 0, -1).await.unwrap(), vec!["z", "a", "b"]);

        kv.delete(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_atomic_decrement_is_all_or_nothing() {
        let kv = RedisKvStore::new("redis://127.0.0.1:6379").await.unwrap();
        let ring = test_key("stock");
        let chain = test_key("stock");
        kv.set(&ring, "2".into()).await.unwrap();
        kv.set(&chain, "1".into()).await.unwrap();

        let counters = [
            CounterDecrement { key: ring.clone(), quantity: 1 },
            CounterDecrement { key: chain.clone(), quantity: 2 },
        ];
        let outcome = kv.atomic_decrement(&counters).await.unwrap();
        assert_eq!(
            outcome,
            AtomicDecrement::Insufficient(PlanShortfall { index: 1, available: 1 })
        );
        assert_eq!(kv.get(&ring).await.unwrap().as_deref(), Some("2"));

        let counters = [
            CounterDecrement { key: ring.clone(), quantity: 2 },
            CounterDecrement { key: chain.clone(), quantity: 1 },
        ];
        let outcome = kv.atomic_decrement(&counters).await.unwrap();
        assert_eq!(
            outcome,
            AtomicDecrement::Applied(vec![
                CounterStep { previous: 2, next: 0 },
                CounterStep { previous: 1, next: 0 },
            ])
        );

        // Cleanup
        kv.delete(&ring).await.unwrap();
        kv.delete(&chain).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    #[allow(clippy::unwrap_used)]
    async fn test_incr_by_with_expiry() {
        let kv = RedisKvStore::new("redis://127.0.0.1:6379").await.unwrap();
        let key = test_key("counter");

        assert_eq!(kv.incr_by(&key, 1).await.unwrap(), 1);
        assert_eq!(kv.incr_by(&key, 2).await.unwrap(), 3);
        kv.expire(&key, 60).await.unwrap();

        kv.delete(&key).await.unwrap();
    }
}
