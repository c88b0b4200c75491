use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub config_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        let mut paths = Self::at(&data_dir);
        if let Ok(path) = env::var("RAG_AUTH_CONFIG_PATH") {
            if !path.trim().is_empty() {
                paths.config_path = PathBuf::from(path);
            }
        }
        paths
    }

    /// Lays the standard files out under `data_dir`, creating the directories.
    pub fn at(data_dir: &Path) -> Self {
        let data_dir = data_dir.to_path_buf();
        let log_dir = data_dir.join("logs");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            config_path: data_dir.join("config.yml"),
            secrets_path: data_dir.join("secrets.yaml"),
            log_dir,
            data_dir,
        }
    }

    pub fn resolve(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.data_dir.join(raw)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("RAG_AUTH_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(dir.path());

        assert_eq!(paths.resolve(Path::new("users.db")), dir.path().join("users.db"));
        assert!(paths.log_dir.exists());
    }

    #[test]
    fn absolute_paths_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(dir.path());
        let absolute = dir.path().join("elsewhere").join("sample.txt");

        assert_eq!(paths.resolve(&absolute), absolute);
    }
}
