//! Configuration path resolution
//!
//! - Linux/macOS: `$XDG_CONFIG_HOME/kubegraph` or `~/.config/kubegraph`
//! - Windows: `%APPDATA%\kubegraph\config`
//!
//! `KUBEGRAPH_CONFIG_DIR` overrides both.

use std::path::{Path, PathBuf};

pub const CONFIG_DIR_ENV: &str = "KUBEGRAPH_CONFIG_DIR";

const APP_NAME: &str = "kubegraph";

/// Get the configuration directory path
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    platform_config_dir()
}

#[cfg(windows)]
fn platform_config_dir() -> PathBuf {
    use directories::ProjectDirs;
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
}

#[cfg(not(windows))]
fn platform_config_dir() -> PathBuf {
    use directories::BaseDirs;
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(".config"))
                .unwrap_or_else(|| PathBuf::from(".").join(".config"))
        })
        .join(APP_NAME)
}

/// Get the root configuration file path
pub fn root_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_config_path_is_in_config_dir() {
        let path = root_config_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("config.yaml"));
        assert_eq!(path.parent(), Some(config_dir().as_path()));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
