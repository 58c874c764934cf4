use crate::error::{Result, UpdaterError};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Relative to the home directory.
pub const DEFAULT_DATA_DIR: &str = ".config/workua-cv-updater";

pub const DB_FILE: &str = "updater.db";
pub const CONFIG_FILE: &str = "config.yaml";
pub const SCREENSHOTS_DIR: &str = "screenshots";
pub const PROFILE_DIR: &str = "profile";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn default_data_dir() -> Result<PathBuf> {
    home::home_dir()
        .map(|h| h.join(DEFAULT_DATA_DIR))
        .ok_or(UpdaterError::HomeNotFound)
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE)
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

pub fn screenshots_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(SCREENSHOTS_DIR)
}

pub fn profile_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(PROFILE_DIR)
}
