//! Response stores and the contract the interceptor uses to reach them.
//!
//! - [`CacheHandle`]: the async get/set capability every store satisfies
//! - [`FileCache`]: default SQLite-backed store, namespaced, with a TTL
//! - [`MemoryCache`]: in-process store for tests and short-lived clients
//! - [`codec`]: versioned encoding of the responses written to a store

pub mod codec;
pub mod connection;
pub mod handle;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use codec::{CodecError, StoredResponse};
pub use connection::{DEFAULT_NAMESPACE, DEFAULT_TTL, FileCache, StoreSettings, default_db_path};
pub use handle::CacheHandle;
pub use memory::MemoryCache;
