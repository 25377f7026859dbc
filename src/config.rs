use crate::error::{PimError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub osascript: String,
    pub mail_limit: usize,
    pub calendar_days: i64,
    pub notes_limit: usize,
    pub default_calendar: Option<String>,
    pub default_reminder_list: Option<String>,
    pub default_notes_folder: Option<String>,
}

impl Config {
    pub fn base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("~"))
            .join(".config")
            .join("pim")
    }

    pub fn config_path() -> PathBuf {
        Self::base_dir().join("config.toml")
    }

    /// Load the config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| PimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        Self::ensure_dir()?;
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| PimError::Config(e.to_string()))?;
        atomic_write(path, content.as_bytes())
    }

    pub fn ensure_dir() -> Result<()> {
        let dir = Self::base_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.osascript.trim().is_empty() {
            return Err(PimError::Config("osascript cannot be empty".to_string()));
        }
        if self.mail_limit == 0 || self.notes_limit == 0 {
            return Err(PimError::Config("limits must be at least 1".to_string()));
        }
        if self.calendar_days < 1 {
            return Err(PimError::Config("calendar_days must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            osascript: "osascript".to_string(),
            mail_limit: 20,
            calendar_days: 7,
            notes_limit: 50,
            default_calendar: None,
            default_reminder_list: None,
            default_notes_folder: None,
        }
    }
}

pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;

    let dir = path.parent().ok_or_else(|| {
        PimError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        ))
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PimError::Io(e.error))?;
    Ok(())
}
