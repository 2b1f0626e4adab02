//! JSON encoding over the raw KV contract.

use serde::Serialize;
use serde_json::Value;
use storefront_core::{KvStore, Result};
use tracing::warn;

/// Read and parse a JSON value. Unparseable values read as missing.
pub(crate) async fn read_json<K: KvStore>(kv: &K, key: &str) -> Result<Option<Value>> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(key, error = %err, "Ignoring unparseable value");
            Ok(None)
        }
    }
}

/// Serialize and write a JSON value.
pub(crate) async fn write_json<K: KvStore, T: Serialize + ?Sized>(
    kv: &K,
    key: &str,
    value: &T,
) -> Result<()> {
    kv.set(key, serde_json::to_string(value)?).await
}

/// Read a JSON boolean flag.
pub(crate) async fn read_flag<K: KvStore>(kv: &K, key: &str) -> Result<Option<bool>> {
    Ok(read_json(kv, key).await?.and_then(|v| v.as_bool()))
}

/// Read an integer counter. Non-integer values read as missing.
pub(crate) async fn read_counter<K: KvStore>(kv: &K, key: &str) -> Result<Option<i64>> {
    Ok(read_json(kv, key).await?.and_then(|value| {
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|n| n.is_finite()).map(floor_to_i64))
    }))
}

#[allow(clippy::cast_possible_truncation)] // Saturating float-to-int cast is the intent
fn floor_to_i64(value: f64) -> i64 {
    value.floor() as i64
}
