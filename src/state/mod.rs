//! State module for tracking crawl progress
//!
//! This module provides the shared state a single crawl run mutates from many
//! workers at once.
//!
//! # Components
//!
//! - `VisitedSet`: Atomic first-claim set of page keys, the deduplication primitive
//! - `WorkerState`: Per-worker idle/processing flag read by the quiescence check

mod visited;
mod worker;

// Re-export main types
pub use visited::VisitedSet;
pub use worker::WorkerState;
