//! Command history - capped in-memory list plus the persisted JSONL log

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Default in-memory capacity
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Default number of persisted entries
pub const DEFAULT_HISTORY_FILE_SIZE: usize = 100;

/// Accepted commands, oldest first, evicting past the cap
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, command: impl Into<String>) {
        self.entries.push_back(command.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// The most recent `n` entries, oldest first
    pub fn last(&self, n: usize) -> Vec<&str> {
        let skip = self.entries.len().saturating_sub(n);
        self.iter().skip(skip).collect()
    }
}

/// One persisted history record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: String,
    pub natural_language: String,
    pub shell_command: String,
}

/// Newline-delimited JSON log truncated to the newest `max_entries`
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
    max_entries: usize,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record and rewrite the file with the newest entries
    pub fn append(&self, natural_language: &str, shell_command: &str) -> std::io::Result<()> {
        let mut records = self.read_all()?;
        records.push(HistoryRecord {
            timestamp: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            natural_language: natural_language.to_string(),
            shell_command: shell_command.to_string(),
        });
        let skip = records.len().saturating_sub(self.max_entries);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&self.path)?;
        for record in &records[skip..] {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// The most recent `n` records, oldest first (all when `n == 0`)
    pub fn last(&self, n: usize) -> std::io::Result<Vec<HistoryRecord>> {
        let records = self.read_all()?;
        if n == 0 {
            return Ok(records);
        }
        let skip = records.len().saturating_sub(n);
        Ok(records.into_iter().skip(skip).collect())
    }

    /// Every readable record; malformed lines are skipped
    fn read_all(&self) -> std::io::Result<Vec<HistoryRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Ok(record) = serde_json::from_str::<HistoryRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}
