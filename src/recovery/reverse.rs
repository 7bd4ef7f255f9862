//! Reading dump files from the end
//!
//! Deciding whether an artifact is finished, and where to continue in an
//! unfinished one, only needs the last few lines of a file that may be many
//! gigabytes long.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::tail::DEFAULT_CHUNK_SIZE;

/// Iterator over the lines of a reader, last line first
///
/// Lines are yielded without their `\n` or `\r\n` terminator. A final line
/// terminator does not produce an empty trailing line. Memory use is bounded
/// by the chunk size plus the longest line read.
pub struct ReverseLines<R> {
    reader: R,
    position: u64,
    buffer: Vec<u8>,
    chunk_size: usize,
    started: bool,
    finished: bool,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(mut reader: R, chunk_size: usize) -> io::Result<Self> {
        let position = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader,
            position,
            buffer: Vec::new(),
            chunk_size: chunk_size.max(1),
            started: false,
            finished: position == 0,
        })
    }

    fn fill(&mut self) -> io::Result<()> {
        let start = self.position.saturating_sub(self.chunk_size as u64);
        let mut chunk = vec![0u8; (self.position - start) as usize];
        self.reader.seek(SeekFrom::Start(start))?;
        self.reader.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&self.buffer);
        self.buffer = chunk;
        self.position = start;

        if !self.started {
            self.started = true;
            if self.buffer.last() == Some(&b'\n') {
                self.buffer.pop();
            }
        }
        Ok(())
    }
}

impl ReverseLines<File> {
    /// Opens `path` for reverse reading
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.started {
                if let Some(idx) = self.buffer.iter().rposition(|b| *b == b'\n') {
                    let line = self.buffer.split_off(idx + 1);
                    self.buffer.truncate(idx);
                    return Some(Ok(decode_line(line)));
                }
                if self.position == 0 {
                    self.finished = true;
                    return Some(Ok(decode_line(std::mem::take(&mut self.buffer))));
                }
            }

            if let Err(e) = self.fill() {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

fn decode_line(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8_lossy(&line).into_owned()
}

/// Returns the last line of `path` that is not blank
pub fn last_nonblank_line(path: &Path) -> io::Result<Option<String>> {
    for line in ReverseLines::open(path)? {
        let line = line?;
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
    Ok(None)
}

/// Returns true if `path` exists and its last non-blank line is `sentinel`
pub fn is_artifact_complete(path: &Path, sentinel: &str) -> io::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    Ok(last_nonblank_line(path)?
        .map(|line| line.trim() == sentinel)
        .unwrap_or(false))
}

/// Returns the title of the last `<page>` record in an XML dump
///
/// Call this after the tail has been recovered, so the last title belongs to
/// a complete page.
pub fn last_page_title(path: &Path) -> io::Result<Option<String>> {
    for line in ReverseLines::open(path)? {
        let line = line?;
        if let Some(title) = extract_title(&line) {
            return Ok(Some(title));
        }
    }
    Ok(None)
}

fn extract_title(line: &str) -> Option<String> {
    let start = line.find("<title>")? + "<title>".len();
    let end = line[start..].find("</title>")? + start;
    Some(unescape_xml(&line[start..end]))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
