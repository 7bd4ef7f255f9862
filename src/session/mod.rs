//! Session module for on-disk dump sessions
//!
//! This module handles everything about the session directory itself:
//! - Choosing the directory and resolving collisions with earlier dumps
//! - Persisting and restoring the session's [`crate::CrawlConfig`]
//! - Naming the artifacts written into the directory

mod naming;
mod path;
mod store;

pub use naming::{
    default_dump_path, domain_to_prefix, DumpArtifact, LIST_END_SENTINEL, PAGE_END_MARKER,
    STATE_FILE_NAME, XML_END_SENTINEL,
};
pub use path::{
    has_session_state, CollisionDecision, CollisionPolicy, FixedPolicy, InteractivePrompt,
    PathCollision, ResolvedPath, SessionPathResolver,
};
pub use store::{
    compute_state_hash, load_session_state, load_session_state_with_hash, save_session_state,
    state_file_path,
};
