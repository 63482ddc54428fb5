//! Line-list loading for GEOSITE / GEOIP pickers
//!
//! Domain-list names and country codes come from large plain-text files, one
//! entry per line. [`spawn_line_loader`] reads such a source on a background
//! thread and streams batches of trimmed, non-empty lines over a channel:
//!
//! 1. `Chunk` whenever `chunk_size` lines are ready, and after every read that
//!    completed at least one line
//! 2. `Progress` after every read
//! 3. `Done` at end of input, or `Error` if reading failed
//!
//! The receiver may be dropped at any time; the thread stops at its next send.

use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, warn};

const READ_BUF_LEN: usize = 64 * 1024;

/// Message sent by the loader thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// A batch of entries
    Chunk {
        /// Trimmed, non-empty lines
        lines: Vec<String>,
        /// Bytes read so far
        received: u64,
        /// Expected size, when known
        total: Option<u64>,
    },
    /// Bytes read so far
    Progress {
        /// Bytes read so far
        received: u64,
        /// Expected size, when known
        total: Option<u64>,
    },
    /// End of input
    Done {
        /// Bytes read
        received: u64,
        /// Expected size, when known
        total: Option<u64>,
        /// Lines delivered in all chunks
        total_lines: usize,
    },
    /// Reading failed; no further events follow
    Error {
        /// Error description
        message: String,
    },
}

struct Batcher {
    tx: Sender<LoadEvent>,
    batch: Vec<String>,
    chunk_size: usize,
    received: u64,
    total: Option<u64>,
    total_lines: usize,
}

/// The receiver is gone.
struct Disconnected;

impl Batcher {
    fn send(&self, event: LoadEvent) -> Result<(), Disconnected> {
        self.tx.send(event).map_err(|_| Disconnected)
    }

    fn push_text(&mut self, bytes: &[u8]) -> Result<(), Disconnected> {
        let text = String::from_utf8_lossy(bytes);
        for line in text.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.batch.push(line.to_string());
            if self.batch.len() >= self.chunk_size {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Disconnected> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.total_lines += self.batch.len();
        let lines = std::mem::take(&mut self.batch);
        self.send(LoadEvent::Chunk {
            lines,
            received: self.received,
            total: self.total,
        })
    }

    fn run<R: Read>(&mut self, mut source: R) -> Result<(), Disconnected> {
        let mut buf = vec![0u8; READ_BUF_LEN];
        let mut pending: Vec<u8> = Vec::new();
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!("Line list read failed: {}", err);
                    return self.send(LoadEvent::Error {
                        message: err.to_string(),
                    });
                }
            };
            self.received += n as u64;
            pending.extend_from_slice(&buf[..n]);

            if let Some(pos) = pending.iter().rposition(|&b| b == b'\n') {
                let rest = pending.split_off(pos + 1);
                self.push_text(&pending)?;
                pending = rest;
                self.flush()?;
            }
            self.send(LoadEvent::Progress {
                received: self.received,
                total: self.total,
            })?;
        }

        self.push_text(&pending)?;
        self.flush()?;
        debug!(
            "Line list loaded: {} bytes, {} lines",
            self.received, self.total_lines
        );
        self.send(LoadEvent::Done {
            received: self.received,
            total: self.total,
            total_lines: self.total_lines,
        })
    }
}

/// Starts reading `source` on a new thread.
///
/// `total` is the expected byte size (e.g. a `Content-Length`), passed
/// through to the events. A `chunk_size` of zero is treated as one.
pub fn spawn_line_loader<R>(source: R, total: Option<u64>, chunk_size: usize) -> Receiver<LoadEvent>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let mut batcher = Batcher {
        tx,
        batch: Vec::new(),
        chunk_size: chunk_size.max(1),
        received: 0,
        total,
        total_lines: 0,
    };
    thread::spawn(move || {
        if batcher.run(source).is_err() {
            debug!("Line list receiver dropped");
        }
    });
    rx
}

/// Drains a loader channel into one list.
///
/// # Errors
///
/// Returns the loader's error message as an `io::Error`, or
/// `UnexpectedEof` if the thread stopped before `Done`.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::{collect_lines, spawn_line_loader};
/// use std::io::Cursor;
///
/// let rx = spawn_line_loader(Cursor::new("google\r\n\r\n  youtube \n"), None, 6000);
/// assert_eq!(collect_lines(rx).unwrap(), vec!["google", "youtube"]);
/// ```
pub fn collect_lines(rx: Receiver<LoadEvent>) -> io::Result<Vec<String>> {
    let mut out = Vec::new();
    for event in rx {
        match event {
            LoadEvent::Chunk { lines, .. } => out.extend(lines),
            LoadEvent::Progress { .. } => {}
            LoadEvent::Done { .. } => return Ok(out),
            LoadEvent::Error { message } => return Err(io::Error::other(message)),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "line loader stopped before completion",
    ))
}

/// Case-insensitive substring filter; an empty (or blank) filter keeps
/// everything.
pub fn filter_entries<'a>(entries: &'a [String], filter: &str) -> Vec<&'a String> {
    let needle = filter.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| needle.is_empty() || e.to_lowercase().contains(&needle))
        .collect()
}

/// Flag emoji for a two-letter country code, or an empty string.
///
/// ```rust
/// use clash_link_serde::iso_to_flag;
///
/// assert_eq!(iso_to_flag("ru"), "\u{1F1F7}\u{1F1FA}");
/// assert_eq!(iso_to_flag("private"), "");
/// ```
pub fn iso_to_flag(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    if upper.len() != 2 || !upper.bytes().all(|b| b.is_ascii_uppercase()) {
        return String::new();
    }
    upper
        .bytes()
        .filter_map(|b| char::from_u32(0x1F1E6 + u32::from(b - b'A')))
        .collect()
}
