//! State module for tracking crawl progress
//!
//! This module provides state management for URLs and hosts during the crawl process.
//!
//! # Components
//!
//! - `VisitState`: Tracks the frontier state of individual URLs (unvisited, in flight, done, failed)
//! - `PageOutcome`: The terminal result of processing one URL
//! - `HostState`: Tracks per-host request spacing for politeness

mod host_state;
mod visit_state;

// Re-export main types
pub use host_state::HostState;
pub use visit_state::{PageOutcome, VisitState};
