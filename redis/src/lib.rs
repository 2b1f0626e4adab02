//! # Storefront Redis
//!
//! [`KvStore`](storefront_core::KvStore) backed by Redis.
//!
//! Products, orders and the order index are stored as JSON strings; stock
//! counters are plain integers so the decrement script can read them with
//! `tonumber`. The multi-key decrement runs as a single Lua script, which
//! Redis executes without interleaving other commands.
//!
//! ## Example
//!
//! ```no_run
//! use storefront_redis::RedisKvStore;
//! use storefront_core::KvStore;
//!
//! # async fn example() -> storefront_core::Result<()> {
//! let kv = RedisKvStore::new("redis://127.0.0.1:6379").await?;
//! kv.set("stock:ring", "3".to_string()).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod script;
pub mod store;

pub use store::RedisKvStore;
