//! Roster Server Library
//!
//! HTTP surface for the client ingest pipeline: a health probe, a trigger
//! that starts a background run, and the live run status.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

pub use routes::{router, AppState};
