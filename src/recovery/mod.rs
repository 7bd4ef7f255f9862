//! Recovery of interrupted dump files
//!
//! [`recover_tail`] cuts a file back to its last complete record.
//! [`ReverseLines`] and its helpers inspect the end of a file without reading
//! the rest of it.

mod reverse;
mod tail;

pub use reverse::{is_artifact_complete, last_nonblank_line, last_page_title, ReverseLines};
pub use tail::{recover_tail, TailRecovery, TailScanner, DEFAULT_CHUNK_SIZE};
