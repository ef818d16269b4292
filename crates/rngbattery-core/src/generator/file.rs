//! File-backed source: a finite stream of raw little-endian `u32` values,
//! replayed from the start whenever it runs out.
//!
//! A file-backed stream is not random in any strict sense once it has
//! rewound, so the counters here are surfaced in the run report.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{GeneratorInfo, GeneratorKind, RandomSource};
use crate::error::{BatteryError, Result};

/// Lifecycle of a file-backed stream.
///
/// `Open -> Serving <-> Rewinding`, and any state `-> Closed` on close or
/// read failure. A closed stream yields zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Open,
    Serving,
    Rewinding,
    Closed,
}

/// Snapshot of a stream's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub state: StreamState,
    /// Whole 32-bit values in the file.
    pub total_values: u64,
    /// Values served since the last rewind (or open).
    pub served_since_rewind: u64,
    /// Values served since open.
    pub total_served: u64,
    pub rewind_count: u64,
}

pub struct FileSource {
    info: GeneratorInfo,
    path: PathBuf,
    reader: BufReader<File>,
    state: StreamState,
    total_values: u64,
    served_since_rewind: u64,
    total_served: u64,
    rewind_count: u64,
    pending_error: Option<BatteryError>,
}

impl FileSource {
    /// Open a raw binary stream. Trailing bytes that do not fill a whole
    /// value are ignored.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let total_values = file.metadata()?.len() / 4;
        if total_values == 0 {
            return Err(BatteryError::EmptyStream { path });
        }
        log::debug!("opened {} with {total_values} values", path.display());
        Ok(Self {
            info: GeneratorInfo::new("file_input_raw", GeneratorKind::File, 32),
            path,
            reader: BufReader::new(file),
            state: StreamState::Open,
            total_values,
            served_since_rewind: 0,
            total_served: 0,
            rewind_count: 0,
            pending_error: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn total_values(&self) -> u64 {
        self.total_values
    }

    pub fn total_served(&self) -> u64 {
        self.total_served
    }

    pub fn rewind_count(&self) -> u64 {
        self.rewind_count
    }

    /// Stop serving values; every later read yields zero.
    pub fn close(&mut self) {
        self.state = StreamState::Closed;
    }

    fn fail(&mut self, err: std::io::Error) -> u32 {
        log::error!("reading {} failed: {err}", self.path.display());
        self.pending_error = Some(BatteryError::Io(err));
        self.state = StreamState::Closed;
        0
    }

    fn rewind(&mut self) -> std::io::Result<()> {
        self.state = StreamState::Rewinding;
        self.reader.seek(SeekFrom::Start(0))?;
        self.served_since_rewind = 0;
        self.rewind_count += 1;
        log::info!(
            "rewound {} after {} values (rewind {})",
            self.path.display(),
            self.total_values,
            self.rewind_count
        );
        self.state = StreamState::Serving;
        Ok(())
    }
}

impl RandomSource for FileSource {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn next_uint(&mut self) -> u32 {
        if self.state == StreamState::Closed {
            return 0;
        }
        self.state = StreamState::Serving;

        let mut buf = [0u8; 4];
        if let Err(err) = self.reader.read_exact(&mut buf) {
            // The file shrank underneath us.
            let err = if err.kind() == ErrorKind::UnexpectedEof {
                std::io::Error::new(ErrorKind::UnexpectedEof, "stream ended before its recorded length")
            } else {
                err
            };
            return self.fail(err);
        }
        self.served_since_rewind += 1;
        self.total_served += 1;

        // Rewind eagerly so the next call starts from the first value.
        if self.served_since_rewind == self.total_values {
            if let Err(err) = self.rewind() {
                self.fail(err);
            }
        }
        u32::from_le_bytes(buf)
    }

    /// Files have no seed; counters only reset when the file is reopened.
    fn reset(&mut self, _seed: u64) {
        log::debug!("{}: reseed ignored, stream continues at value {}", self.info.name, self.served_since_rewind);
    }

    fn take_error(&mut self) -> Option<BatteryError> {
        self.pending_error.take()
    }

    fn stream_stats(&self) -> Option<StreamStats> {
        Some(StreamStats {
            state: self.state,
            total_values: self.total_values,
            served_since_rewind: self.served_since_rewind,
            total_served: self.total_served,
            rewind_count: self.rewind_count,
        })
    }
}
