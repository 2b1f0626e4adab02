//! In-memory key-value store.

use super::INJECTED_FAILURE;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storefront_core::stock::{plan_decrement, AtomicDecrement, CounterDecrement, StockLine};
use storefront_core::{KvStore, Result, ShopError};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, String>,
    lists: HashMap<String, VecDeque<String>>,
    ttls: HashMap<String, u64>,
    faults: Vec<WriteFault>,
}

/// Writes to keys starting with `prefix` fail once `skip` writes have
/// passed; `remaining` counts failures down when set.
#[derive(Debug)]
struct WriteFault {
    prefix: String,
    skip: u32,
    remaining: Option<u32>,
}

/// In-memory [`KvStore`].
///
/// Clones share state. The atomic decrement runs under a single lock, so
/// it is indivisible like a server-side script. TTLs are recorded but never
/// expire keys.
#[derive(Debug, Clone)]
pub struct MemoryKvStore {
    state: Arc<Mutex<State>>,
    scripting: bool,
    fail_writes: Arc<AtomicBool>,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvStore {
    /// Store with scripting available.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            scripting: true,
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Store whose atomic decrement reports
    /// [`ShopError::ScriptUnavailable`].
    #[must_use]
    pub fn without_scripting() -> Self {
        Self {
            scripting: false,
            ..Self::new()
        }
    }

    /// Make every write fail with [`ShopError::Kv`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every write to a key starting with `prefix` fail.
    pub async fn fail_writes_to(&self, prefix: &str) {
        self.state.lock().await.faults.push(WriteFault {
            prefix: prefix.to_string(),
            skip: 0,
            remaining: None,
        });
    }

    /// Make only the next write to a key starting with `prefix` fail.
    pub async fn fail_next_write_to(&self, prefix: &str) {
        self.fail_write_to_after(prefix, 0).await;
    }

    /// Let `skip` writes to keys starting with `prefix` through, then fail
    /// the one after.
    pub async fn fail_write_to_after(&self, prefix: &str, skip: u32) {
        self.state.lock().await.faults.push(WriteFault {
            prefix: prefix.to_string(),
            skip,
            remaining: Some(1),
        });
    }

    /// TTL last set on `key`.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        self.state.lock().await.ttls.get(key).copied()
    }

    /// Every list key and its contents, for assertions.
    pub async fn list(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn check_writable(&self, state: &mut State, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ShopError::Kv(INJECTED_FAILURE.into()));
        }
        let Some(index) = state.faults.iter().position(|fault| key.starts_with(&fault.prefix)) else {
            return Ok(());
        };
        let fault = &mut state.faults[index];
        if fault.skip > 0 {
            fault.skip -= 1;
            return Ok(());
        }
        let exhausted = match &mut fault.remaining {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => false,
        };
        if exhausted {
            state.faults.remove(index);
        }
        Err(ShopError::Kv(INJECTED_FAILURE.into()))
    }
}

/// Resolve Redis-style inclusive, possibly negative, range bounds.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len_signed = isize::try_from(len).ok()?;
    let start = if start < 0 { (len_signed + start).max(0) } else { start };
    let stop = if stop < 0 { len_signed + stop } else { stop.min(len_signed - 1) };
    if len == 0 || start > stop || start >= len_signed {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.lock().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut state = self.state.lock().await;
        self.check_writable(&mut state, key)?;
        state.values.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        self.check_writable(&mut state, key)?;
        state.values.remove(key);
        state.lists.remove(key);
        state.ttls.remove(key);
        Ok(())
    }

    async fn lpush(&self, key: &str, value: String) -> Result<()> {
        let mut state = self.state.lock().await;
        self.check_writable(&mut state, key)?;
        state.lists.entry(key.to_string()).or_default().push_front(value);
        Ok(())
    }

    async fn rpush(&self, key: &str, values: Vec<String>) -> Result<()> {
        let mut state = self.state.lock().await;
        self.check_writable(&mut state, key)?;
        state.lists.entry(key.to_string()).or_default().extend(values);
        Ok(())
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(resolve_range(list.len(), start, stop)
            .map(|(from, to)| list.range(from..=to).cloned().collect())
            .unwrap_or_default())
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64> {
        let mut state = self.state.lock().await;
        self.check_writable(&mut state, key)?;
        let current = match state.values.get(key) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ShopError::Kv(format!("value at {key} is not an integer")))?,
            None => 0,
        };
        let next = current.saturating_add(delta);
        state.values.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<()> {
        let mut state = self.state.lock().await;
        self.check_writable(&mut state, key)?;
        state.ttls.insert(key.to_string(), seconds);
        Ok(())
    }

    async fn atomic_decrement(&self, counters: &[CounterDecrement]) -> Result<AtomicDecrement> {
        if !self.scripting {
            return Err(ShopError::ScriptUnavailable);
        }
        let mut state = self.state.lock().await;
        for counter in counters {
            self.check_writable(&mut state, &counter.key)?;
        }
        let lines: Vec<StockLine> = counters
            .iter()
            .map(|counter| StockLine {
                slug: counter.key.clone(),
                quantity: counter.quantity,
            })
            .collect();
        let current: Vec<i64> = counters
            .iter()
            .map(|counter| {
                state
                    .values
                    .get(&counter.key)
                    .and_then(|raw| raw.parse::<i64>().ok())
                    .unwrap_or(0)
            })
            .collect();

        match plan_decrement(&lines, &current) {
            Ok(steps) => {
                for (counter, step) in counters.iter().zip(&steps) {
                    state.values.insert(counter.key.clone(), step.next.to_string());
                }
                Ok(AtomicDecrement::Applied(steps))
            }
            Err(shortfall) => Ok(AtomicDecrement::Insufficient(shortfall)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use storefront_core::stock::{CounterStep, PlanShortfall};

    fn counter(key: &str, quantity: u64) -> CounterDecrement {
        CounterDecrement {
            key: key.into(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_lrange_matches_redis_semantics() {
        let kv = MemoryKvStore::new();
        kv.rpush("l", vec!["a".into(), "b".into(), "c".into()]).await.unwrap();
        kv.lpush("l", "z".into()).await.unwrap();

        assert_eq!(kv.lrange("l", 0, -1).await.unwrap(), vec!["z", "a", "b", "c"]);
        assert_eq!(kv.lrange("l", 1, 2).await.unwrap(), vec!["a", "b"]);
        assert_eq!(kv.lrange("l", 0, 999).await.unwrap().len(), 4);
        assert!(kv.lrange("l", 5, 9).await.unwrap().is_empty());
        assert!(kv.lrange("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_atomic_decrement_all_or_nothing() {
        let kv = MemoryKvStore::new();
        kv.set("a", "3".into()).await.unwrap();
        kv.set("b", "1".into()).await.unwrap();

        let failed = kv.atomic_decrement(&[counter("a", 1), counter("b", 2)]).await.unwrap();
        assert_eq!(
            failed,
            AtomicDecrement::Insufficient(PlanShortfall { index: 1, available: 1 })
        );
        assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("3"));

        let applied = kv.atomic_decrement(&[counter("a", 3), counter("b", 1)]).await.unwrap();
        assert_eq!(
            applied,
            AtomicDecrement::Applied(vec![
                CounterStep { previous: 3, next: 0 },
                CounterStep { previous: 1, next: 0 },
            ])
        );
    }

    #[tokio::test]
    async fn test_without_scripting_and_failures() {
        let kv = MemoryKvStore::without_scripting();
        assert_eq!(
            kv.atomic_decrement(&[counter("a", 1)]).await.unwrap_err(),
            ShopError::ScriptUnavailable
        );

        kv.fail_writes(true);
        assert!(kv.set("a", "1".into()).await.is_err());
        assert!(kv.incr_by("a", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_targeted_write_faults() {
        let kv = MemoryKvStore::new();
        kv.fail_next_write_to("order:").await;
        kv.fail_writes_to("stock:chain").await;

        assert!(kv.set("order:cs_1", "{}".into()).await.is_err());
        kv.set("order:cs_1", "{}".into()).await.unwrap();
        assert!(kv.set("stock:chain", "1".into()).await.is_err());
        assert!(kv.incr_by("stock:chain", 1).await.is_err());
        kv.set("stock:ring", "1".into()).await.unwrap();

        kv.fail_write_to_after("product:", 1).await;
        kv.set("product:a", "{}".into()).await.unwrap();
        assert!(kv.set("product:a", "{}".into()).await.is_err());
        kv.set("product:a", "{}".into()).await.unwrap();
    }

    #[tokio::test]
    async fn test_incr_by_and_expire() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.incr_by("n", 1).await.unwrap(), 1);
        assert_eq!(kv.incr_by("n", 4).await.unwrap(), 5);
        kv.expire("n", 65).await.unwrap();
        assert_eq!(kv.ttl("n").await, Some(65));

        kv.set("s", "\"text\"".into()).await.unwrap();
        assert!(kv.incr_by("s", 1).await.is_err());
    }
}
