//! Network access for stash.
//!
//! This crate provides the HTTP implementation of the engine's
//! `NetworkFetcher` trait, shared by the server and any other host.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher};
