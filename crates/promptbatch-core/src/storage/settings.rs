//! Settings and prompt template store.

use super::error::{StorageError, StorageResult};
use crate::config::promptbatch_home;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed setting keys.
pub mod keys {
    /// Model name.
    pub const MODEL: &str = "model";
    /// Sampling temperature, stored as typed.
    pub const TEMPERATURE: &str = "temperature";
    /// Completion token limit, stored as typed.
    pub const MAX_TOKENS: &str = "max_tokens";
    /// System message sent before each prompt.
    pub const SYSTEM_MESSAGE: &str = "system_message";
    /// Service credential.
    pub const API_KEY: &str = "api_key";

    /// Every accepted key.
    pub const ALL: [&str; 5] = [MODEL, TEMPERATURE, MAX_TOKENS, SYSTEM_MESSAGE, API_KEY];

    /// Whether `key` is one of the fixed keys.
    pub fn is_valid(key: &str) -> bool {
        ALL.contains(&key)
    }
}

/// A named system message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Template name.
    pub name: String,
    /// Template text.
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    settings: BTreeMap<String, String>,
    #[serde(default)]
    templates: BTreeMap<String, String>,
}

/// Stores settings and templates in a TOML file.
///
/// The file is read on every call and rewritten on every change. Because it may
/// hold the service credential, it is written with owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    /// Opens the store at the default path (`<promptbatch home>/settings.toml`).
    #[must_use]
    pub fn open_default() -> Self {
        Self::open(promptbatch_home().join("settings.toml"))
    }

    /// Opens a store at a custom path. The file is created on first write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { file_path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn load(&self) -> StorageResult<SettingsFile> {
        if !self.file_path.exists() {
            return Ok(SettingsFile::default());
        }
        let contents = fs::read_to_string(&self.file_path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn save(&self, file: &SettingsFile) -> StorageResult<()> {
        if let Some(dir) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        fs::write(&self.file_path, toml::to_string_pretty(file)?)?;

        // Set file permissions to 0600 (rw-------)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.file_path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.file_path.display(), "Settings saved");
        Ok(())
    }

    /// Returns the stored value for `key`, if any.
    ///
    /// # Errors
    /// `InvalidKey` for keys outside [`keys::ALL`].
    pub fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        if !keys::is_valid(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.load()?.settings.get(key).cloned())
    }

    /// Stores `value` under `key`. Values are kept verbatim.
    ///
    /// # Errors
    /// `InvalidKey` for keys outside [`keys::ALL`].
    pub fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        if !keys::is_valid(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let mut file = self.load()?;
        file.settings.insert(key.to_string(), value.to_string());
        self.save(&file)
    }

    /// Every stored setting, ordered by key.
    pub fn list_settings(&self) -> StorageResult<BTreeMap<String, String>> {
        Ok(self.load()?.settings)
    }

    /// Every template, ordered by name.
    pub fn list_templates(&self) -> StorageResult<Vec<PromptTemplate>> {
        Ok(self
            .load()?
            .templates
            .into_iter()
            .map(|(name, content)| PromptTemplate { name, content })
            .collect())
    }

    /// Looks up one template.
    pub fn get_template(&self, name: &str) -> StorageResult<Option<PromptTemplate>> {
        Ok(self
            .load()?
            .templates
            .remove(name)
            .map(|content| PromptTemplate { name: name.to_string(), content }))
    }

    /// Creates or replaces a template.
    ///
    /// # Errors
    /// `InvalidData` if the name is blank.
    pub fn save_template(&self, name: &str, content: &str) -> StorageResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidData("template name cannot be empty".to_string()));
        }
        let mut file = self.load()?;
        file.templates.insert(name.to_string(), content.to_string());
        self.save(&file)
    }

    /// Removes a template.
    ///
    /// # Errors
    /// `NotFound` if no template has that name.
    pub fn delete_template(&self, name: &str) -> StorageResult<()> {
        let mut file = self.load()?;
        if file.templates.remove(name).is_none() {
            return Err(StorageError::NotFound(format!("template '{}'", name)));
        }
        self.save(&file)
    }
}
