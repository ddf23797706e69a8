//! Configuration settings for Syllabus.

use crate::agent::MAX_TOOL_ROUNDS;
use crate::error::{Result, SyllabusError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub session: SessionSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.syllabus".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model used for answering.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit per model call.
    pub max_tokens: u32,
    /// Maximum number of tool rounds per query.
    pub max_tool_rounds: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 800,
            max_tool_rounds: MAX_TOOL_ROUNDS,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.syllabus/courses.db".to_string(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Maximum number of fragments returned per search.
    pub max_results: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { max_results: 5 }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Number of exchanges kept as conversation history.
    pub max_history: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { max_history: 2 }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SyllabusError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("syllabus")
            .join("config.toml")
    }

    /// Set a value by dotted key, e.g. `llm.model`.
    ///
    /// The value is parsed to the type of the existing entry, so
    /// `llm.max_tool_rounds` only accepts integers.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| SyllabusError::Config(format!("Key must be <section>.<key>: {}", key)))?;

        let mut root =
            toml::Value::try_from(&*self).map_err(|e| SyllabusError::Config(e.to_string()))?;

        let table = root
            .get_mut(section)
            .and_then(|s| s.as_table_mut())
            .ok_or_else(|| SyllabusError::Config(format!("Unknown config section: {}", section)))?;

        let parsed = match table.get(field) {
            Some(toml::Value::String(_)) => toml::Value::String(value.to_string()),
            Some(toml::Value::Integer(_)) => toml::Value::Integer(value.parse().map_err(|_| {
                SyllabusError::Config(format!("{} expects an integer, got '{}'", key, value))
            })?),
            Some(toml::Value::Float(_)) => toml::Value::Float(value.parse().map_err(|_| {
                SyllabusError::Config(format!("{} expects a number, got '{}'", key, value))
            })?),
            Some(toml::Value::Boolean(_)) => toml::Value::Boolean(value.parse().map_err(|_| {
                SyllabusError::Config(format!("{} expects true or false, got '{}'", key, value))
            })?),
            // Unset optional fields such as prompts.custom_dir
            None if section == "prompts" && field == "custom_dir" => {
                toml::Value::String(value.to_string())
            }
            _ => {
                return Err(SyllabusError::Config(format!(
                    "Unknown or non-scalar config key: {}",
                    key
                )))
            }
        };
        table.insert(field.to_string(), parsed);

        *self = root
            .try_into()
            .map_err(|e: toml::de::Error| SyllabusError::Config(e.to_string()))?;
        Ok(())
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.max_tool_rounds, 2);
        assert_eq!(settings.llm.max_tokens, 800);
        assert_eq!(settings.retrieval.max_results, 5);
        assert_eq!(settings.session.max_history, 2);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o"

            [retrieval]
            max_results = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.llm.max_tool_rounds, 2);
        assert_eq!(settings.retrieval.max_results, 3);
        assert_eq!(settings.vector_store.provider, "sqlite");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.llm.max_tool_rounds = 3;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.llm.max_tool_rounds, 3);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded.general.data_dir, "~/.syllabus");
    }

    #[test]
    fn test_set_typed_values() {
        let mut settings = Settings::default();
        settings.set("llm.model", "gpt-4o").unwrap();
        settings.set("llm.max_tool_rounds", "1").unwrap();
        settings.set("llm.temperature", "0.5").unwrap();
        settings.set("prompts.custom_dir", "~/prompts").unwrap();

        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.llm.max_tool_rounds, 1);
        assert!((settings.llm.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(settings.prompts.custom_dir.as_deref(), Some("~/prompts"));
    }

    #[test]
    fn test_set_rejects_bad_keys_and_values() {
        let mut settings = Settings::default();
        assert!(settings.set("model", "x").is_err());
        assert!(settings.set("nope.model", "x").is_err());
        assert!(settings.set("llm.nope", "x").is_err());
        assert!(settings.set("llm.max_tool_rounds", "two").is_err());
        assert_eq!(settings.llm.max_tool_rounds, 2);
    }
}
