//! State module for tracking session progress
//!
//! This module provides the lifecycle state machine for a dump session.
//!
//! # Components
//!
//! - `SessionState`: Tracks where a session is (fresh, resuming, active, complete, aborted)

mod session_state;

// Re-export main types
pub use session_state::SessionState;
