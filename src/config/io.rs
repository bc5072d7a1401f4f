//! Configuration file I/O operations

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use super::Config;

impl Config {
    /// Get the global config directory path (~/.levelup/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".levelup")
    }

    /// Get the global config file path (~/.levelup/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Load and validate configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `path` if given, else the global config. A missing global file
    /// yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let global_path = Self::global_config_path();
        if global_path.exists() {
            Self::from_file(&global_path)
        } else {
            tracing::debug!(path = %global_path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write config file text after checking it parses and validates.
    ///
    /// Writers serialize on `<path>.lock`; the text lands in a temp file
    /// that is renamed over `path`, so readers never see a partial file.
    /// Invalid text is rejected and leaves any existing file untouched.
    pub fn write_file(path: &Path, content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).context("Refusing to write unparsable config")?;
        config
            .validate()
            .context("Refusing to write invalid config")?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.with_extension("lock"))
            .context("Failed to open config lock")?;
        lock.lock_exclusive()
            .context("Another levelup process is writing the config")?;

        let staged = path.with_extension("toml.partial");
        {
            let mut file = File::create(&staged)
                .with_context(|| format!("Failed to stage config: {}", staged.display()))?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&staged, path)
            .with_context(|| format!("Failed to replace config: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Wrote config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let written = Config::write_file(&path, "[leveling]\nmax_level = 20\n").unwrap();
        assert_eq!(written.leveling.max_level, 20);

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.leveling.max_level, 20);
        assert!(!path.with_extension("toml.partial").exists());
    }

    #[test]
    fn test_write_rejects_invalid_and_keeps_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::write_file(&path, "[leveling]\nxp_per_level = 500\n").unwrap();

        assert!(Config::write_file(&path, "[leveling]\nxp_per_level = 0\n").is_err());
        assert!(Config::write_file(&path, "not toml [").is_err());

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.leveling.xp_per_level, 500);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[leveling]\nmax_level = 0\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
