use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Accepted input lines, oldest first.
///
/// `persisted` marks how many leading entries are already in the history
/// file, so `history -a` only ever writes what came after.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    persisted: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrates a session from its history file. Loaded lines count as persisted.
    pub fn load(path: &Path) -> Result<Self> {
        let mut history = Self::new();
        history.read_from(path)?;
        history.persisted = history.entries.len();
        Ok(history)
    }

    pub fn add(&mut self, line: &str) {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return;
        }
        self.entries.push(line.to_string());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `n` entries with their original 1-based index.
    pub fn last(&self, n: usize) -> impl Iterator<Item = (usize, &str)> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, entry)| (i + 1, entry.as_str()))
    }

    /// `history -r`: appends every line of the file. Returns how many were read.
    pub fn read_from(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("{}", path.display()))?;
        let before = self.entries.len();
        for line in content.lines() {
            self.add(line);
        }
        Ok(self.entries.len() - before)
    }

    /// `history -w`: replaces the file with the whole list.
    pub fn write_to(&mut self, path: &Path) -> Result<()> {
        let mut body = String::new();
        for entry in &self.entries {
            body.push_str(entry);
            body.push('\n');
        }
        fs::write(path, body).with_context(|| format!("{}", path.display()))?;
        self.persisted = self.entries.len();
        Ok(())
    }

    /// `history -a`: appends the entries added since the last write or append.
    pub fn append_to(&mut self, path: &Path) -> Result<usize> {
        let pending = &self.entries[self.persisted.min(self.entries.len())..];
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("{}", path.display()))?;
        for entry in pending {
            writeln!(file, "{}", entry).with_context(|| format!("{}", path.display()))?;
        }
        let written = pending.len();
        self.persisted = self.entries.len();
        Ok(written)
    }
}
