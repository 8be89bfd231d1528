use serde::{Deserialize, Serialize};

use crate::models::QualityRecord;

/// A pending spreadsheet row awaiting quality check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRow {
    /// 1-based sheet row number
    pub row_index: usize,
    /// Raw formatted transcript text from the transcript column
    pub transcript: String,
    /// Source identifier (usually the audio file name)
    pub source: String,
}

/// One buffered result, held until the next flush
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub row_index: usize,
    pub record: QualityRecord,
}

/// A single header-addressed cell write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row_index: usize,
    pub header: String,
    pub value: String,
}

/// Running counters emitted after every processed row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub rows_read: usize,
    pub rows_processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Final tally for one batch run
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReport {
    pub rows_read: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_short: usize,
    pub batches_flushed: usize,
}

/// Known roster of agent display names, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Parse a comma-separated list, discarding blanks
    pub fn from_csv(input: &str) -> Self {
        let names = input
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { names }
    }

    /// Load a roster from a file with one name per line
    pub fn from_file(path: &std::path::Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let names = content
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Ok(Self { names })
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Display form used inside prompts
    pub fn joined(&self) -> String {
        self.names.join("、")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_roster_from_csv() {
        let roster = Roster::from_csv("鈴木, 田中,, 佐藤 ");
        assert_eq!(roster.names(), &["鈴木", "田中", "佐藤"]);
        assert_eq!(roster.joined(), "鈴木、田中、佐藤");
    }

    #[test]
    fn test_roster_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "鈴木\n\n田中").unwrap();
        let roster = Roster::from_file(file.path()).unwrap();
        assert_eq!(roster.names(), &["鈴木", "田中"]);
    }

    #[test]
    fn test_empty_roster() {
        assert!(Roster::from_csv("  , ").is_empty());
    }
}
