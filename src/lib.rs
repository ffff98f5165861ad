//! chronolog - in-memory, time-indexed log store
//!
//! Ingests timestamped messages per service over HTTP, answers inclusive
//! time-range queries, and purges entries older than the retention window.

pub mod api;
pub mod config;
pub mod logging;
pub mod store;
