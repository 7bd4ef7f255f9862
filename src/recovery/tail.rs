//! Trailing partial record removal
//!
//! A dump file is a sequence of records, each closed by a known end marker.
//! When a process is killed mid-write, the file can end in the middle of a
//! record. Appending to such a file would produce a malformed dump, so before
//! resuming we cut the file back to the end of its last complete record.
//!
//! The file is scanned backward in fixed-size chunks. Only the current chunk
//! and a `marker.len() - 1` byte overlap with the chunk after it are held in
//! memory, so markers that straddle a chunk boundary are still found and
//! memory use does not depend on the file size.

use crate::DumpError;
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Default backward read size
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Result of a tail recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailRecovery {
    /// The file already ended on a record boundary and was not modified
    Intact { len: u64 },

    /// A trailing partial record was removed
    Truncated { offset: u64, discarded: u64 },

    /// The file held no complete record and was truncated to zero length
    NoCompleteRecord { discarded: u64 },
}

impl TailRecovery {
    /// Length of the file after recovery
    pub fn offset(&self) -> u64 {
        match self {
            Self::Intact { len } => *len,
            Self::Truncated { offset, .. } => *offset,
            Self::NoCompleteRecord { .. } => 0,
        }
    }

    /// Number of bytes removed
    pub fn discarded(&self) -> u64 {
        match self {
            Self::Intact { .. } => 0,
            Self::Truncated { discarded, .. } | Self::NoCompleteRecord { discarded } => *discarded,
        }
    }

    /// Returns true if the file was modified
    pub fn modified(&self) -> bool {
        self.discarded() > 0
    }
}

/// Backward scanner for record boundaries
#[derive(Debug, Clone, Copy)]
pub struct TailScanner {
    chunk_size: usize,
}

impl Default for TailScanner {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl TailScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `chunk_size` bytes per backward read (at least one)
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Finds the offset just past the last complete record
    ///
    /// The boundary is the position right after the last occurrence of
    /// `marker`, extended over a directly following `\n` or `\r\n` so the line
    /// that closes the record stays with it. Returns 0 if `marker` does not
    /// occur. An empty marker matches the end of the input.
    pub fn find_boundary<R: Read + Seek>(&self, reader: &mut R, marker: &[u8]) -> io::Result<u64> {
        let total = reader.seek(SeekFrom::End(0))?;
        if marker.is_empty() {
            return Ok(total);
        }

        let overlap = marker.len() - 1;
        let mut end = total;
        let mut carry: Vec<u8> = Vec::with_capacity(overlap);
        let mut window: Vec<u8> = Vec::with_capacity(self.chunk_size + overlap);

        while end > 0 {
            let start = end.saturating_sub(self.chunk_size as u64);
            window.clear();
            window.resize((end - start) as usize, 0);
            reader.seek(SeekFrom::Start(start))?;
            reader.read_exact(&mut window)?;
            window.extend_from_slice(&carry);

            if let Some(pos) = window.windows(marker.len()).rposition(|w| w == marker) {
                let marker_end = start + (pos + marker.len()) as u64;
                tracing::debug!(
                    "Record end marker found at byte {} after scanning {} bytes",
                    marker_end - marker.len() as u64,
                    total - start
                );
                return skip_line_terminator(reader, marker_end, total);
            }

            carry.clear();
            carry.extend_from_slice(&window[..overlap.min(window.len())]);
            end = start;
        }

        Ok(0)
    }

    /// Truncates the file at `path` to its last complete record
    ///
    /// This mutates the file in place and cannot be undone. Call it once per
    /// resume, before anything is appended. Do not call it on a finished
    /// artifact: its closing sentinel is not a record and would be cut.
    pub fn recover(&self, path: &Path, marker: &[u8]) -> Result<TailRecovery, DumpError> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let total = file.metadata()?.len();
        let boundary = self.find_boundary(&mut file, marker)?;

        if boundary >= total {
            tracing::debug!("{} ends on a record boundary", path.display());
            return Ok(TailRecovery::Intact { len: total });
        }

        file.set_len(boundary)?;
        file.sync_all()?;

        let discarded = total - boundary;
        if boundary == 0 {
            tracing::warn!(
                "{} held no complete record; discarded {} bytes",
                path.display(),
                discarded
            );
            Ok(TailRecovery::NoCompleteRecord { discarded })
        } else {
            tracing::info!(
                "Truncated {} at byte {}, discarding {} bytes of a partial record",
                path.display(),
                boundary,
                discarded
            );
            Ok(TailRecovery::Truncated {
                offset: boundary,
                discarded,
            })
        }
    }
}

/// Truncates a dump file to its last complete record
///
/// # Arguments
///
/// * `path` - The dump file
/// * `marker` - The text that closes a record (e.g. `</page>`)
///
/// # Returns
///
/// * `Ok(TailRecovery)` - What was done; `.offset()` is the new file length
/// * `Err(DumpError)` - The file could not be read or truncated
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use wikidump::recover_tail;
///
/// let outcome = recover_tail(Path::new("dump/wiki-history.xml"), "</page>").unwrap();
/// println!("dump now ends at byte {}", outcome.offset());
/// ```
pub fn recover_tail(path: &Path, marker: &str) -> Result<TailRecovery, DumpError> {
    TailScanner::default().recover(path, marker.as_bytes())
}

fn skip_line_terminator<R: Read + Seek>(reader: &mut R, offset: u64, total: u64) -> io::Result<u64> {
    let available = (total - offset).min(2) as usize;
    if available == 0 {
        return Ok(offset);
    }

    let mut next = [0u8; 2];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut next[..available])?;

    match &next[..available] {
        [b'\n', ..] => Ok(offset + 1),
        [b'\r', b'\n'] => Ok(offset + 2),
        _ => Ok(offset),
    }
}
