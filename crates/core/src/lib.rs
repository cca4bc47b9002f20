//! Core types and shared functionality for stash.
//!
//! This crate provides:
//! - Generation-partitioned response cache with memory and SQLite backends
//! - The offline-first policy engine (routing, strategies, lifecycle)
//! - Unified error types
//! - Configuration structures
//! - The contact-message repository

pub mod cache;
pub mod canonical;
pub mod config;
pub mod error;
pub mod messages;
pub mod net;
pub mod policy;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheBackend, CacheDb, CacheEntry, CacheHandle, CacheStore, MemoryBackend};
pub use config::{AppConfig, BackendKind, ConfigError, WorkerConfig};
pub use error::Error;
pub use messages::{Envelope, InMemoryMessages, Message, MessageRepository, NewMessage};
pub use net::{Destination, NetworkFetcher, Request, Response};
pub use policy::{LifecycleManager, LifecycleState, LifecycleStatus, RequestClass, Served, Source, Strategy};
