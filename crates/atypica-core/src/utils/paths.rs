use std::path::PathBuf;

const APP_NAME: &str = "atypica";

/// Standardized application directories.
pub struct AppPaths;

impl AppPaths {
    /// Return the user-level config directory (platform-specific)
    pub fn user_config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().to_path_buf())
    }

    /// Return the user-level data directory (platform-specific)
    pub fn user_data_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().to_path_buf())
    }

    pub fn log_dir() -> Option<PathBuf> {
        Self::user_data_dir().map(|d| d.join("logs"))
    }
}
