use crate::OutputFormat;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use simgroup::{ScanOptions, SimilarityGroup};
use std::fs;
use std::path::Path;

#[derive(Serialize, Debug)]
struct ScanReport {
    generated_at: String,
    root: String,
    threshold: u32,
    groups: Vec<ReportGroup>,
}

#[derive(Serialize, Debug)]
struct ReportGroup {
    images: Vec<ReportImage>,
}

#[derive(Serialize, Debug)]
struct ReportImage {
    path: String,
    size_bytes: Option<u64>,
}

/// Human readable file size.
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes < 1024 {
        format!("{} B", size_bytes)
    } else if size_bytes < 1024 * 1024 {
        format!("{:.1} KB", size_bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size_bytes as f64 / (1024.0 * 1024.0))
    }
}

pub fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).map(|m| m.len()).ok()
}

pub fn describe_image(path: &Path) -> String {
    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let size = file_size(path)
        .map(format_size)
        .unwrap_or_else(|| "missing".to_string());
    format!("{} ({}) - {}", name, size, path.display())
}

/// Listing lines for every group, followed by a blank separator line.
pub fn group_lines(groups: &[SimilarityGroup]) -> Vec<String> {
    let mut lines = Vec::new();
    for (idx, group) in groups.iter().enumerate() {
        lines.push(format!("Group {} ({} images):", idx + 1, group.len()));
        for path in group.paths() {
            lines.push(format!("  - {}", describe_image(path)));
        }
        lines.push(String::new());
    }
    lines
}

pub fn save_report(
    output: &Path,
    format: OutputFormat,
    root: &Path,
    options: &ScanOptions,
    groups: &[SimilarityGroup],
    lines: &[String],
) -> Result<()> {
    let content = match format {
        OutputFormat::Text => lines.join("\n"),
        OutputFormat::Json => {
            let report = ScanReport {
                generated_at: Utc::now().to_rfc3339(),
                root: root.to_string_lossy().into_owned(),
                threshold: options.threshold,
                groups: groups
                    .iter()
                    .map(|group| ReportGroup {
                        images: group
                            .paths()
                            .iter()
                            .map(|path| ReportImage {
                                path: path.to_string_lossy().into_owned(),
                                size_bytes: file_size(path),
                            })
                            .collect(),
                    })
                    .collect(),
            };
            serde_json::to_string_pretty(&report)?
        }
    };

    fs::write(output, content)
        .with_context(|| format!("Failed to write results to {:?}", output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_group_lines() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.png");
        fs::write(&a, vec![0u8; 2048]).unwrap();
        let b = temp_dir.path().join("b.png");

        let lines = group_lines(&[SimilarityGroup::new(vec![a.clone(), b.clone()])]);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Group 1 (2 images):");
        assert_eq!(lines[1], format!("  - a.png (2.0 KB) - {}", a.display()));
        assert_eq!(lines[2], format!("  - b.png (missing) - {}", b.display()));
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_save_json_report() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("report.json");
        let groups = vec![SimilarityGroup::new(vec![
            PathBuf::from("x/1.png"),
            PathBuf::from("x/2.png"),
        ])];

        save_report(
            &output,
            OutputFormat::Json,
            Path::new("x"),
            &ScanOptions::default(),
            &groups,
            &[],
        )
        .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(value["threshold"], 5);
        assert_eq!(value["root"], "x");
        assert_eq!(value["groups"][0]["images"][1]["path"], "x/2.png");
        assert!(value["groups"][0]["images"][0]["size_bytes"].is_null());
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_save_text_report() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("report.txt");
        let lines = vec!["Group 1 (2 images):".to_string(), "  - a".to_string()];

        save_report(
            &output,
            OutputFormat::Text,
            temp_dir.path(),
            &ScanOptions::default(),
            &[],
            &lines,
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "Group 1 (2 images):\n  - a"
        );
    }
}
