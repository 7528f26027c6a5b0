use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const HISTORY_FILE: &str = ".history.jsonl";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub timestamp: String,
    pub kept: Vec<String>,
    pub trashed: Vec<String>,
    pub action: String, // "trashed"
}

impl ReviewRecord {
    pub fn trashed(kept: &[PathBuf], trashed: &[PathBuf]) -> Self {
        let lossy = |paths: &[PathBuf]| {
            paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect()
        };
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kept: lossy(kept),
            trashed: lossy(trashed),
            action: "trashed".to_string(),
        }
    }
}

pub fn history_path(root: &Path) -> PathBuf {
    root.join(HISTORY_FILE)
}

pub fn append_record(root: &Path, record: &ReviewRecord) -> Result<()> {
    let history_file = history_path(root);
    let mut out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&history_file)
        .with_context(|| format!("Failed to open history file {:?}", history_file))?;
    writeln!(out, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

/// Every line of the history file, parsed independently so one bad line
/// does not hide the rest.
pub fn read_records(root: &Path) -> Result<Vec<Result<ReviewRecord, serde_json::Error>>> {
    let history_file = history_path(root);
    let f = File::open(&history_file)
        .with_context(|| format!("Could not open history file {:?}", history_file))?;

    let mut records = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str::<ReviewRecord>(&line));
    }
    Ok(records)
}

pub fn print_history(root: &Path) -> Result<()> {
    println!("🗂️  Review History:");
    for (i, record) in read_records(root)?.into_iter().enumerate() {
        match record {
            Ok(rec) => println!(
                "[{}] {}\n     kept: {:?}\n     {}: {:?}\n",
                i, rec.timestamp, rec.kept, rec.action, rec.trashed
            ),
            Err(err) => eprintln!("⚠️  Skipping malformed entry {}: {}", i, err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let first = ReviewRecord::trashed(&[PathBuf::from("a.png")], &[PathBuf::from("b.png")]);
        let second = ReviewRecord::trashed(
            &[],
            &[PathBuf::from("c.png"), PathBuf::from("d.png")],
        );
        append_record(root, &first).unwrap();
        append_record(root, &second).unwrap();

        let records = read_records(root).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap(), &first);
        assert_eq!(records[1].as_ref().unwrap().trashed, vec!["c.png", "d.png"]);
        assert_eq!(records[1].as_ref().unwrap().action, "trashed");
    }

    #[test]
    fn test_malformed_lines_are_kept_separate() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let good = ReviewRecord::trashed(&[], &[PathBuf::from("x.png")]);
        fs::write(
            history_path(root),
            format!("{{broken\n\n{}\n", serde_json::to_string(&good).unwrap()),
        )
        .unwrap();

        let records = read_records(root).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_err());
        assert_eq!(records[1].as_ref().unwrap(), &good);
    }

    #[test]
    fn test_missing_history_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_records(temp_dir.path()).is_err());
    }
}
