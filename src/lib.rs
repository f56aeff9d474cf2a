//! precache - cache-first static asset serving for offline-capable pages
//!
//! A worker pre-caches a fixed manifest of URLs on install, drops stale cache
//! versions on activate, and answers fetches from the cache before falling
//! back to the network.

pub mod config;
pub mod contexts;
pub mod data;
pub mod network;
pub mod stores;
