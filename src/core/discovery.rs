use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognized as images when no other set is configured.
pub const DEFAULT_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp"];

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

/// Case-insensitive set of recognized image extensions (stored without the dot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageExtensions {
    extensions: HashSet<String>,
}

impl ImageExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for ImageExtensions {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

/// Recursively list image files under `root`.
///
/// Entries that cannot be read are skipped. A symlink to a file is listed
/// under its link path; symlinked directories are not descended. Siblings are visited in file-name order so repeated scans of the same tree
/// yield the same sequence.
pub fn list_candidate_paths(root: &Path, extensions: &ImageExtensions) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
    {
        // `Path::is_file` resolves symlinks, `DirEntry::file_type` does not.
        if !entry.path().is_file() {
            continue;
        }

        if extensions.matches(entry.path()) {
            candidates.push(entry.into_path());
        }
    }

    log::debug!(
        "Discovered {} candidate images under {}",
        candidates.len(),
        root.display()
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let exts = ImageExtensions::default();
        assert!(exts.matches(Path::new("a/b/photo.JPG")));
        assert!(exts.matches(Path::new("scan.Tiff")));
        assert!(exts.matches(Path::new("x.webp")));
        assert!(!exts.matches(Path::new("notes.txt")));
        assert!(!exts.matches(Path::new("jpg")));
        assert!(!exts.matches(Path::new("raw.cr2")));
    }

    #[test]
    fn test_custom_extensions_accept_leading_dot() {
        let exts = ImageExtensions::new([".PNG", "tif", ""]);
        assert!(exts.matches(Path::new("a.png")));
        assert!(exts.matches(Path::new("a.TIF")));
        assert!(!exts.matches(Path::new("a.jpg")));
        assert!(!exts.is_empty());
    }

    #[test]
    fn test_list_candidates_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("b.png"), b"x").unwrap();
        fs::write(root.join("a.JPEG"), b"x").unwrap();
        fs::write(root.join("readme.md"), b"x").unwrap();
        fs::write(root.join("nested/c.gif"), b"x").unwrap();
        fs::write(root.join("nested/deeper/d.webp"), b"x").unwrap();
        // A directory with an image-like name is not a candidate.
        fs::create_dir_all(root.join("folder.png")).unwrap();

        let found = list_candidate_paths(root, &ImageExtensions::default());
        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a.JPEG"),
                PathBuf::from("b.png"),
                PathBuf::from("nested/c.gif"),
                PathBuf::from("nested/deeper/d.webp"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_listed_but_directories_not_descended() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().unwrap();
        fs::create_dir_all(outside.path().join("album")).unwrap();
        fs::write(outside.path().join("target.png"), b"x").unwrap();
        fs::write(outside.path().join("album/inner.png"), b"x").unwrap();

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("real.png"), b"x").unwrap();
        symlink(outside.path().join("target.png"), root.join("link.png")).unwrap();
        symlink(outside.path().join("album"), root.join("linked_album")).unwrap();
        symlink(outside.path().join("missing.png"), root.join("dangling.png")).unwrap();

        let found = list_candidate_paths(root, &ImageExtensions::default());
        assert_eq!(found, vec![root.join("link.png"), root.join("real.png")]);
    }

    #[test]
    fn test_list_candidates_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_candidate_paths(temp_dir.path(), &ImageExtensions::default()).is_empty());
    }
}
