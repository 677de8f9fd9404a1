//! Configuration module
//!
//! Models the external settings record handed down from a caller-owned
//! settings collaborator. `Settings` is a plain data record the caller
//! constructs and hands to the installer; it does not load settings files,
//! parse arguments, or prompt interactively.

use std::path::PathBuf;

use crate::constants::DEFAULT_MAX_WORKERS;

/// Configuration record consumed by `granite-installer`.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory the installed game tree is written under.
    pub working_path: PathBuf,
    /// Scratch directory chunk files are written under during a chunked
    /// main-archive download.
    pub temp_path: PathBuf,
    /// Worker pool size handed to the task engine.
    pub max_workers: usize,
    /// The Minecraft version to install, e.g. `"1.20.4"`.
    pub current_version: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let temp_root = std::env::var_os("TEMP")
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.clone());

        Self {
            working_path: cwd,
            temp_path: temp_root.join("Granite").join("temp"),
            max_workers: DEFAULT_MAX_WORKERS,
            current_version: None,
        }
    }
}

impl Settings {
    /// Build settings from environment variables only; no argument
    /// parsing, no file loading.
    pub fn from_env() -> Self {
        let mut settings = Settings::default();

        if let Some(path) = std::env::var_os("GRANITE_WORKING_PATH") {
            settings.working_path = PathBuf::from(path);
        }
        if let Some(path) = std::env::var_os("GRANITE_TEMP_PATH") {
            settings.temp_path = PathBuf::from(path);
        }
        if let Ok(workers) = std::env::var("GRANITE_MAX_WORKERS") {
            if let Ok(parsed) = workers.parse::<usize>() {
                if parsed > 0 {
                    settings.max_workers = parsed;
                }
            }
        }
        if let Ok(version) = std::env::var("GRANITE_VERSION") {
            settings.current_version = Some(version);
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_default_worker_count() {
        let settings = Settings::default();
        assert_eq!(settings.max_workers, DEFAULT_MAX_WORKERS);
        assert!(settings.current_version.is_none());
    }

    #[test]
    fn default_temp_path_ends_in_granite_temp() {
        let settings = Settings::default();
        assert_eq!(settings.temp_path.file_name().unwrap(), "temp");
        assert_eq!(
            settings.temp_path.parent().unwrap().file_name().unwrap(),
            "Granite"
        );
    }
}
