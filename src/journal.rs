// Invocation-scoped decision journal

//! Buffered journal of reconciliation decisions
//!
//! Entries accumulate in memory and are appended to the journal file in
//! batches at the checkpoints the engine defines. Every line carries a
//! timestamp captured when the journal was created, so all entries of one
//! invocation share the same stamp. Dropping the journal flushes whatever
//! is still buffered, covering error exits.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Buffered, append-only journal for one reconciliation invocation
pub struct Journal {
    path: PathBuf,
    stamp: String,
    entries: Vec<String>,
}

impl Journal {
    /// Create a journal writing to `path`, stamping entries with the
    /// current local time
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            stamp: Local::now().format("%Y/%m/%d %H:%M:%S").to_string(),
            entries: Vec::new(),
        }
    }

    /// Buffer one entry and mirror it to the diagnostic log
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.entries.push(format!("{} {}\n", self.stamp, message));
    }

    /// Append all buffered entries to the journal file and clear the buffer
    pub fn flush(&mut self) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create journal directory")?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open journal {}", self.path.display()))?;

        for entry in &self.entries {
            file.write_all(entry.as_bytes())
                .context("Failed to append to journal")?;
        }
        self.entries.clear();

        Ok(())
    }

    /// Number of entries still buffered
    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("Failed to flush journal on drop: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_appends_stamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut journal = Journal::new(path.clone());
        journal.record("first");
        journal.record("second");
        assert_eq!(journal.pending(), 2);
        journal.flush().unwrap();
        assert_eq!(journal.pending(), 0);

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" first"));
        assert!(lines[1].ends_with(" second"));

        // YYYY/MM/DD HH:MM:SS prefix, identical on both lines
        let stamp = &lines[0][..19];
        assert_eq!(&lines[1][..19], stamp);
        assert_eq!(stamp.as_bytes()[4], b'/');
        assert_eq!(stamp.as_bytes()[7], b'/');
        assert_eq!(stamp.as_bytes()[13], b':');
    }

    #[test]
    fn test_flush_with_no_entries_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut journal = Journal::new(path.clone());
        journal.flush().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_second_flush_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut journal = Journal::new(path.clone());
        journal.record("one");
        journal.flush().unwrap();
        journal.record("two");
        journal.flush().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_drop_flushes_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");

        {
            let mut journal = Journal::new(path.clone());
            journal.record("unflushed");
        }

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("unflushed"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("test.log");

        let mut journal = Journal::new(path.clone());
        journal.record("entry");
        journal.flush().unwrap();
        assert!(path.exists());
    }
}
