//! Whole-file JSON stores.
//!
//! A store is read completely, changed in memory and written back through a
//! temp file in the same directory that is then renamed over the original.
//! A failed run leaves the previous file untouched.

use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ArchiveError, Result};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| ArchiveError::json(path, e))
}

/// Load a store whose top level must be a JSON object.
///
/// A missing file is an empty store; the first merge creates it.
pub fn load_object(path: &Path) -> Result<Map<String, Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "store does not exist yet, starting empty");
            return Ok(Map::new());
        }
        Err(e) => return Err(ArchiveError::io(path, e)),
    };
    match serde_json::from_str(&text).map_err(|e| ArchiveError::json(path, e))? {
        Value::Object(map) => Ok(map),
        other => Err(ArchiveError::shape(
            path,
            format!("expected a JSON object at top level, found {}", kind(&other)),
        )),
    }
}

/// Write `value` as pretty JSON, replacing `path` atomically.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut w, value).map_err(|e| ArchiveError::json(path, e))?;
        w.write_all(b"\n").map_err(|e| ArchiveError::io(path, e))?;
        w.flush().map_err(|e| ArchiveError::io(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| ArchiveError::io(path, e.error))?;
    debug!(path = %path.display(), "saved");
    Ok(())
}

/// Sibling path for a store's review file: `people.json` → `people.conflicts.json`.
pub fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("store");
    path.with_file_name(format!("{stem}.{suffix}.json"))
}

pub fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = load_object(&dir.path().join("people.json")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.json");
        let value = json!({"Zoe Zed": {"role": "Student"}, "Adam Ant": {"role": "Faculty"}});
        save_json(&path, &value).unwrap();

        let map = load_object(&path).unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, vec!["Zoe Zed", "Adam Ant"]);
        assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
    }

    #[test]
    fn test_non_object_store_is_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(load_object(&path), Err(ArchiveError::Shape { .. })));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"a\": ").unwrap();
        assert!(matches!(load_object(&path), Err(ArchiveError::Json { .. })));
    }

    #[test]
    fn test_failed_save_leaves_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{\"kept\": true}").unwrap();

        // target directory that does not exist: nothing is written anywhere
        let bad = dir.path().join("missing").join("store.json");
        assert!(save_json(&bad, &json!({"x": 1})).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"kept\": true}");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        save_json(&path, &json!({"a": 1})).unwrap();
        save_json(&path, &json!({"a": 2})).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["store.json"]);
    }

    #[test]
    fn test_sidecar_name() {
        assert_eq!(
            sidecar(Path::new("data/bmc_people_index.json"), "conflicts"),
            PathBuf::from("data/bmc_people_index.conflicts.json")
        );
    }
}
