use std::env;
use std::fs;
use std::path::PathBuf;

/// Directory layout for persisted artifacts and logs.
///
/// Everything lives under a single data root (default `data/` next to the
/// binary's project root) so the whole output tree can be relocated with one
/// environment variable.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub data_dir: PathBuf,
    pub raw_data_dir: PathBuf,
    pub processed_data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let data_dir = env::var("INTELLISCRAPE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("data"));

        Self::with_data_dir(project_root, data_dir)
    }

    pub fn with_data_dir(project_root: PathBuf, data_dir: PathBuf) -> Self {
        let raw_data_dir = data_dir.join("raw_data");
        let processed_data_dir = data_dir.join("processed_data");
        let log_dir = data_dir.join("logs");

        for dir in [&data_dir, &raw_data_dir, &processed_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            data_dir,
            raw_data_dir,
            processed_data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("INTELLISCRAPE_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("Cargo.toml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_artifact_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));

        assert!(paths.raw_data_dir.is_dir());
        assert!(paths.processed_data_dir.is_dir());
        assert!(paths.log_dir.is_dir());
    }
}
