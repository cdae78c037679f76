//! Persistence helpers for the artifact tree.
//!
//! Artifacts are keyed by a second-resolution timestamp; a collision within
//! the same second overwrites, which is acceptable at interactive cadence.
//! Readers return `None` for missing files instead of erroring.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::{Map, Value};

use crate::core::errors::ApiError;

/// Filesystem-safe timestamp, e.g. `20250309_142530`.
pub fn format_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Replaces characters that are invalid in filenames on common filesystems.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect()
}

pub fn save_text(folder: &Path, filename: &str, data: &str) -> Result<PathBuf, ApiError> {
    let path = prepare_path(folder, filename)?;
    fs::write(&path, data).map_err(ApiError::internal)?;
    Ok(path)
}

pub fn load_text(folder: &Path, filename: &str) -> Option<String> {
    let path = folder.join(filename);
    if !path.exists() {
        return None;
    }
    fs::read_to_string(path).ok()
}

pub fn save_json(folder: &Path, filename: &str, data: &Value) -> Result<PathBuf, ApiError> {
    let path = prepare_path(folder, filename)?;
    let serialized = serde_json::to_string_pretty(data).map_err(ApiError::internal)?;
    fs::write(&path, serialized).map_err(ApiError::internal)?;
    Ok(path)
}

pub fn load_json(folder: &Path, filename: &str) -> Option<Value> {
    let path = folder.join(filename);
    if !path.exists() {
        return None;
    }
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Writes records as CSV. Headers come from the first record's keys; every
/// record is projected onto that header set, missing values as empty cells.
pub fn save_csv(
    folder: &Path,
    filename: &str,
    records: &[Map<String, Value>],
) -> Result<PathBuf, ApiError> {
    let path = prepare_path(folder, filename)?;

    let mut writer = csv::Writer::from_path(&path).map_err(ApiError::internal)?;

    if let Some(first) = records.first() {
        let headers: Vec<&String> = first.keys().collect();
        writer
            .write_record(headers.iter().map(|h| h.as_str()))
            .map_err(ApiError::internal)?;

        for record in records {
            let row: Vec<String> = headers
                .iter()
                .map(|key| match record.get(*key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                })
                .collect();
            writer.write_record(&row).map_err(ApiError::internal)?;
        }
    }

    writer.flush().map_err(ApiError::internal)?;
    Ok(path)
}

fn prepare_path(folder: &Path, filename: &str) -> Result<PathBuf, ApiError> {
    fs::create_dir_all(folder).map_err(ApiError::internal)?;
    Ok(folder.join(clean_filename(filename)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamp_is_filesystem_safe() {
        let ts = format_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts, clean_filename(&ts));
        assert!(ts.chars().nth(8) == Some('_'));
    }

    #[test]
    fn clean_filename_replaces_invalid_characters() {
        assert_eq!(clean_filename("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(clean_filename("plain_name.txt"), "plain_name.txt");
    }

    #[test]
    fn text_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let saved = save_text(tmp.path(), "note.txt", "hello\nworld").unwrap();
        assert!(saved.exists());
        assert_eq!(load_text(tmp.path(), "note.txt").unwrap(), "hello\nworld");
    }

    #[test]
    fn json_round_trip_preserves_value() {
        let tmp = tempfile::tempdir().unwrap();
        let value = json!({"title": "T", "items": [1, 2, 3], "nested": {"ok": true}});
        save_json(tmp.path(), "data.json", &value).unwrap();
        assert_eq!(load_json(tmp.path(), "data.json").unwrap(), value);
    }

    #[test]
    fn loaders_return_none_for_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_text(tmp.path(), "missing.txt").is_none());
        assert!(load_json(tmp.path(), "missing.json").is_none());
    }

    #[test]
    fn csv_projects_records_onto_first_header_set() {
        let tmp = tempfile::tempdir().unwrap();
        let records = vec![
            json!({"Title": "A", "Date": "2025-03-09"}),
            json!({"Title": "B"}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect::<Vec<_>>();

        save_csv(tmp.path(), "out.csv", &records).unwrap();
        let contents = load_text(tmp.path(), "out.csv").unwrap();
        // serde_json maps iterate in key order, so headers are sorted.
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Date,Title");
        assert_eq!(lines[1], "2025-03-09,A");
        assert_eq!(lines[2], ",B");
    }
}
