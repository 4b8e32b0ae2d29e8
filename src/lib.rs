//! Precache - offline asset cache
//!
//! Pre-caches a fixed asset manifest into a versioned named store, serves
//! requests cache-first with network fallback, and prunes stale versions
//! when a new one activates.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod manifest;
pub mod network;
pub mod resource;
pub mod storage;
pub mod ui;
pub mod worker;

pub use error::{PrecacheError, PrecacheResult};
