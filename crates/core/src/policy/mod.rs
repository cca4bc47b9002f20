//! Offline-first fetch policy engine.
//!
//! - [`Router`] classifies a request by URL shape
//! - [`Strategies`] runs cache-first, network-first, stale-while-revalidate
//!   or network-first-with-fallback against the [`CacheStore`](crate::cache::CacheStore)
//! - [`OfflineFallback`] answers when nothing else can
//! - [`LifecycleManager`] installs and activates generations and is the
//!   interception entry point

pub mod fallback;
pub mod lifecycle;
pub mod router;
pub mod strategy;

pub use fallback::OfflineFallback;
pub use lifecycle::{GenerationStatus, LifecycleManager, LifecycleState, LifecycleStatus};
pub use router::{RequestClass, Router, is_page_request};
pub use strategy::{Served, Source, Strategies, Strategy};
