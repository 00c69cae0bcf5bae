//! State module for tracking mirror progress
//!
//! This module provides the lifecycle state machine for crawl targets.
//!
//! # Components
//!
//! - `TargetState`: Tracks the state of individual targets (discovered, queued, fetching, fetched, etc.)

mod target_state;

// Re-export main types
pub use target_state::TargetState;
