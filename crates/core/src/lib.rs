//! Core types and shared functionality for replay.
//!
//! This crate provides:
//! - The cache handle contract and its SQLite and in-memory stores
//! - The versioned codec for stored responses
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheHandle, FileCache, MemoryCache, StoreSettings, StoredResponse};
pub use config::{CacheBackend, CacheFailurePolicy, CacheSection, ConfigError};
pub use error::Error;
