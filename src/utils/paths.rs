use dirs::home_dir;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

const DEFAULT_DIR_NAME: &str = ".budget_wizard";
const HOME_ENV: &str = "BUDGET_WIZARD_HOME";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const STORAGE_DIR: &str = "storage";
const CATALOG_DIR: &str = "catalog";
const HISTORY_FILE: &str = "history.txt";

/// Application data directory, defaulting to `~/.budget_wizard`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn config_dir_in(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR)
}

pub fn config_file_in(base: &Path) -> PathBuf {
    config_dir_in(base).join(CONFIG_FILE)
}

/// Client storage entries, one file per key.
pub fn storage_dir_in(base: &Path) -> PathBuf {
    base.join(STORAGE_DIR)
}

/// Destination of catalogs written by the `import` command.
pub fn catalog_dir_in(base: &Path) -> PathBuf {
    base.join(CATALOG_DIR)
}

pub fn history_file_in(base: &Path) -> PathBuf {
    base.join(HISTORY_FILE)
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
