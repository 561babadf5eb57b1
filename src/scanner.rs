use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ArchiveError, Result};

/// Batch files to merge, given either a single file or a directory of them.
///
/// Directory layout: `{dir}/*.json`, one batch per file, taken in file-name
/// order. Review sidecars (`*.conflicts.json`) and dotfiles are skipped.
pub fn discover_batches(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(ArchiveError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_batch_file(p))
        .collect();
    files.sort();
    Ok(files)
}

fn is_batch_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".json") && !name.starts_with('.') && !name.ends_with(".conflicts.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("batch.json");
        fs::write(&file, "[]").unwrap();
        assert_eq!(discover_batches(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_directory_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "02_faculty.json",
            "01_students.json",
            "people.conflicts.json",
            ".hidden.json",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let found: Vec<String> = discover_batches(dir.path())
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        assert_eq!(found, vec!["01_students.json", "02_faculty.json"]);
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_batches(&dir.path().join("nope")),
            Err(ArchiveError::Io { .. })
        ));
    }
}
