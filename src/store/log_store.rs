use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::errors::IntakeResult;
use crate::store::record::{last_timestamp, LogRecord};

pub const DEFAULT_STALE_AFTER_MS: u64 = 2000;

/// Append-only intake log that restarts itself after a quiet period.
///
/// The read-check-rotate-append sequence runs under `write_lock`, so
/// concurrent requests in this process cannot interleave between reading
/// the last line and appending. Other processes writing the same file are
/// not coordinated.
pub struct LogStore {
    path: PathBuf,
    stale_after_ms: u64,
    write_lock: Mutex<()>,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>, stale_after_ms: u64) -> Self {
        Self {
            path: path.into(),
            stale_after_ms,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record` using the current server clock for the staleness check.
    pub async fn append(&self, record: &LogRecord) -> IntakeResult<String> {
        self.append_at(record, chrono::Utc::now().timestamp_millis()).await
    }

    /// Appends `record`, truncating the file first when the last stored
    /// record is more than `stale_after_ms` older than `now_ms`.
    /// Returns the written line without its newline.
    pub async fn append_at(&self, record: &LogRecord, now_ms: i64) -> IntakeResult<String> {
        let _guard = self.write_lock.lock().await;

        let content = self.read_content().await?;
        let rotate = match last_timestamp(&content) {
            Some(last) => {
                let gap = now_ms as f64 - last;
                tracing::debug!(last, now = now_ms, gap, "checked last record");
                gap > self.stale_after_ms as f64
            }
            None => {
                if !content.trim().is_empty() {
                    tracing::warn!(path = %self.path.display(), "last line unreadable, skipping rotation");
                }
                false
            }
        };

        let line = record.to_line();
        let mut options = OpenOptions::new();
        options.create(true);
        let mut buf = String::with_capacity(line.len() + 2);
        if rotate {
            tracing::info!(path = %self.path.display(), "stale log, starting a new session");
            options.write(true).truncate(true);
        } else {
            options.append(true);
            // Terminate a dangling last record so the new one starts its own line.
            if !content.is_empty() && !content.ends_with('\n') {
                buf.push('\n');
            }
        }
        buf.push_str(&line);
        buf.push('\n');

        let mut file = options.open(&self.path).await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        tracing::info!(line = %line, rotated = rotate, "record appended");
        Ok(line)
    }

    /// Current log lines, oldest first. A missing file reads as empty.
    pub async fn read_lines(&self) -> IntakeResult<Vec<String>> {
        let content = self.read_content().await?;
        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Invalid UTF-8 is replaced rather than rejected, so stray bytes in the
    /// history cannot block further appends.
    async fn read_content(&self) -> IntakeResult<String> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}
