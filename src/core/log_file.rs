// src/core/log_file.rs

//! A `Write` implementation enforcing a soft 1 GiB / 10 MiB head-truncation
//! log rotation policy. Hand-rolled because the policy (discard the oldest
//! 10 MiB by truncating from the head, rather than rolling to a new file)
//! doesn't match the rotation model of the usual day/size-rotation crates.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Mutex;

const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;
const TRUNCATE_CHUNK: u64 = 10 * 1024 * 1024;

struct Inner {
    path: PathBuf,
    file: File,
}

/// Cloneable, `Write`-implementing handle suitable for a
/// `tracing_subscriber::fmt::layer().with_writer(...)`.
#[derive(Clone)]
pub struct RollingFileWriter {
    inner: std::sync::Arc<Mutex<Inner>>,
}

impl RollingFileWriter {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            inner: std::sync::Arc::new(Mutex::new(Inner { path, file })),
        })
    }

    fn roll_if_needed(inner: &mut Inner) -> io::Result<()> {
        let size = inner.file.metadata()?.len();
        if size < MAX_FILE_SIZE {
            return Ok(());
        }

        let mut full = Vec::with_capacity(size as usize);
        {
            let mut reader = File::open(&inner.path)?;
            reader.read_to_end(&mut full)?;
        }

        let keep_from = TRUNCATE_CHUNK.min(full.len() as u64) as usize;
        let remaining = &full[keep_from..];

        let mut writer = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&inner.path)?;
        writer.write_all(remaining)?;
        writer.flush()?;

        inner.file = OpenOptions::new().append(true).open(&inner.path)?;
        Ok(())
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Self::roll_if_needed(&mut inner)?;
        inner.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.file.flush()
    }
}

impl Seek for RollingFileWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.file.seek(pos)
    }
}
