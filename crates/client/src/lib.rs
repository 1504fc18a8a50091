//! HTTP client layers for replay.
//!
//! - [`http`]: request and response model
//! - [`Delegate`]: the contract every request-performing layer satisfies
//! - [`HttpAgent`]: reqwest-backed delegate
//! - [`CachedAgent`]: replays responses keyed by the exact request text
//! - [`Browser`]: page history and link following over any delegate

pub mod browser;
pub mod cached;
pub mod delegate;
pub mod fetch;
pub mod http;

#[cfg(test)]
mod testing;

pub use browser::{Browser, Link, Page};
pub use cached::{CachedAgent, CachedAgentConfig};
pub use delegate::{Delegate, FromConfig, RequestOptions};
pub use fetch::{AgentConfig, HttpAgent};
pub use http::{Provenance, Request, Response};
pub use replay_core::{CacheFailurePolicy, CacheHandle, CacheSection, Error, FileCache, MemoryCache};
