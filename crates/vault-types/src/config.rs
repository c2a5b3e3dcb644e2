//! Configuration loading for the vault indexer.
//!
//! Layered config: defaults -> config file -> CLI config file -> env vars.
//! CLI flags are applied by the caller after [`Settings::load`] returns.
//! The default config file lives at `~/.config/vault-index/config.toml`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::VaultError;

/// Directory (relative to the vault root) holding the state and index files.
pub const DEFAULT_DATA_DIR: &str = ".vault-index";

/// File name of the persisted state.
pub const STATE_FILE_NAME: &str = "index_state.json";

/// File name of the append-only content index.
pub const INDEX_FILE_NAME: &str = "content_index.jsonl";

/// File name of the JSON tag export.
pub const TAGS_JSON_FILE_NAME: &str = "tags_index.json";

/// Split a comma- or newline-separated rule list, dropping blanks.
pub fn parse_rule_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_rule_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RuleList {
        Many(Vec<String>),
        One(String),
    }

    Ok(match RuleList::deserialize(deserializer)? {
        RuleList::Many(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        RuleList::One(raw) => parse_rule_list(&raw),
    })
}

mod secret_string {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

fn default_vault_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_token() -> SecretString {
    SecretString::from(String::new())
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_summary_chars() -> usize {
    180
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_concurrency() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_tags_export_path() -> String {
    "Tags.md".to_string()
}

fn default_debounce_ms() -> u64 {
    600
}

fn default_checkpoint_interval() -> usize {
    10
}

fn default_external_modify_delay_ms() -> u64 {
    3_000
}

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory of the note vault
    #[serde(default = "default_vault_root")]
    pub vault_root: PathBuf,

    /// Where state and index files live (default: `<vault>/.vault-index`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base URL of the OpenAI-compatible API (empty disables summaries)
    #[serde(default)]
    pub api_base_url: String,

    /// API token (empty disables summaries)
    #[serde(default = "default_api_token", with = "secret_string")]
    pub api_token: SecretString,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_summary_chars")]
    pub max_summary_chars: usize,

    /// Per-request gateway timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Recorded for the settings surface; requests are issued one at a time
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default, deserialize_with = "deserialize_rule_list")]
    pub excluded_folders: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_rule_list")]
    pub excluded_file_patterns: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_rule_list")]
    pub excluded_tags: Vec<String>,

    /// Whether advisory notifications are shown
    #[serde(default = "default_true")]
    pub enable_notifications: bool,

    /// Model ids discovered from the models endpoint
    #[serde(default)]
    pub discovered_models: Vec<String>,

    /// Base URL that produced `discovered_models`
    #[serde(default)]
    pub model_catalog_endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_catalog_fetched_at: Option<DateTime<Utc>>,

    /// Markdown tag export location, relative to the vault root
    #[serde(default = "default_tags_export_path")]
    pub tags_export_path: String,

    /// Export tags after every completed rebuild
    #[serde(default)]
    pub auto_export_tags: bool,

    /// Event queue debounce window
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Rebuild checkpoint interval, in files
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Settle time for modifications made outside the editor
    #[serde(default = "default_external_modify_delay_ms")]
    pub external_modify_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_root: default_vault_root(),
            data_dir: None,
            log_level: default_log_level(),
            api_base_url: String::new(),
            api_token: default_api_token(),
            model: default_model(),
            max_summary_chars: default_max_summary_chars(),
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            excluded_folders: Vec::new(),
            excluded_file_patterns: Vec::new(),
            excluded_tags: Vec::new(),
            enable_notifications: true,
            discovered_models: Vec::new(),
            model_catalog_endpoint: String::new(),
            model_catalog_fetched_at: None,
            tags_export_path: default_tags_export_path(),
            auto_export_tags: false,
            debounce_ms: default_debounce_ms(),
            checkpoint_interval: default_checkpoint_interval(),
            external_modify_delay_ms: default_external_modify_delay_ms(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/vault-index/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (VAULT_INDEX_*)
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, VaultError> {
        let default_config_path = Self::default_config_path().with_extension("");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| VaultError::Config(e.to_string()))?
            .set_default("model", default_model())
            .map_err(|e| VaultError::Config(e.to_string()))?
            .set_default("timeout_ms", default_timeout_ms() as i64)
            .map_err(|e| VaultError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: VAULT_INDEX_API_BASE_URL, VAULT_INDEX_EXCLUDED_TAGS, etc.
        builder = builder.add_source(
            Environment::with_prefix("VAULT_INDEX")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| VaultError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| VaultError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Location of the per-user config file.
    pub fn default_config_path() -> PathBuf {
        ProjectDirs::from("", "", "vault-index")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Write these settings as TOML to `path`.
    pub fn save(&self, path: &Path) -> Result<(), VaultError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| VaultError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.max_summary_chars == 0 {
            return Err(VaultError::Config("max_summary_chars must be > 0".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(VaultError::Config("timeout_ms must be > 0".to_string()));
        }
        if self.checkpoint_interval == 0 {
            return Err(VaultError::Config("checkpoint_interval must be > 0".to_string()));
        }
        Ok(())
    }

    /// Summaries are attempted only with a base URL and a token.
    pub fn has_api_config(&self) -> bool {
        !self.api_base_url.trim().is_empty() && !self.api_token.expose_secret().trim().is_empty()
    }

    /// Directory holding state and index files.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| self.vault_root.join(DEFAULT_DATA_DIR))
    }

    pub fn state_file_path(&self) -> PathBuf {
        self.data_dir().join(STATE_FILE_NAME)
    }

    pub fn index_file_path(&self) -> PathBuf {
        self.data_dir().join(INDEX_FILE_NAME)
    }

    pub fn tags_json_path(&self) -> PathBuf {
        self.data_dir().join(TAGS_JSON_FILE_NAME)
    }

    /// Markdown tag export target inside the vault.
    pub fn tags_export_file(&self) -> PathBuf {
        let relative = if self.tags_export_path.trim().is_empty() {
            default_tags_export_path()
        } else {
            self.tags_export_path.clone()
        };
        self.vault_root.join(relative)
    }

    /// Models to offer for selection: the discovered catalog (only when it
    /// came from the current endpoint) plus the configured model, sorted.
    pub fn model_options(&self) -> Vec<String> {
        let endpoint_matches = self.model_catalog_endpoint.trim().to_lowercase()
            == self.api_base_url.trim().to_lowercase();
        let mut options: Vec<String> = Vec::new();
        let discovered = if endpoint_matches {
            self.discovered_models.as_slice()
        } else {
            &[]
        };
        for model in discovered.iter().chain(std::iter::once(&self.model)) {
            if !model.is_empty() && !options.contains(model) {
                options.push(model.clone());
            }
        }
        options.sort();
        options
    }

    /// One-line description of the cached model catalog.
    pub fn model_catalog_status_text(&self) -> String {
        if self.api_base_url.trim().is_empty() {
            return "Set API Base URL and token, then refresh models.".to_string();
        }
        if self.discovered_models.is_empty() {
            return "No discovered models cached for this endpoint yet.".to_string();
        }
        let at = self
            .model_catalog_fetched_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown time".to_string());
        format!(
            "Cached {} model(s), fetched at {}",
            self.discovered_models.len(),
            at
        )
    }

    /// Store a freshly discovered catalog. Switches `model` to the first
    /// discovered model when the current one is not offered.
    pub fn apply_model_catalog(&mut self, models: Vec<String>, fetched_at: DateTime<Utc>) {
        if !models.is_empty() && !models.contains(&self.model) {
            self.model = models[0].clone();
        }
        self.discovered_models = models;
        self.model_catalog_endpoint = self.api_base_url.trim().to_string();
        self.model_catalog_fetched_at = Some(fetched_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.max_summary_chars, 180);
        assert_eq!(settings.timeout_ms, 15_000);
        assert_eq!(settings.debounce_ms, 600);
        assert_eq!(settings.checkpoint_interval, 10);
        assert!(settings.enable_notifications);
        assert!(!settings.has_api_config());
    }

    #[test]
    fn test_parse_rule_list() {
        assert_eq!(parse_rule_list("a,b\n c \n\n"), vec!["a", "b", "c"]);
        assert!(parse_rule_list(" , \n").is_empty());
    }

    #[test]
    fn test_rule_list_accepts_string_or_array() {
        let from_string: Settings =
            toml::from_str("excluded_folders = \"Daily Notes, Archive\"").unwrap();
        assert_eq!(from_string.excluded_folders, vec!["Daily Notes", "Archive"]);

        let from_array: Settings =
            toml::from_str("excluded_tags = [\"private\", \" \"]").unwrap();
        assert_eq!(from_array.excluded_tags, vec!["private"]);
    }

    #[test]
    fn test_has_api_config_requires_url_and_token() {
        let mut settings = Settings::default();
        settings.api_base_url = "https://api.example.com".to_string();
        assert!(!settings.has_api_config());

        settings.api_token = SecretString::from("sk-test".to_string());
        assert!(settings.has_api_config());

        settings.api_base_url = "   ".to_string();
        assert!(!settings.has_api_config());
    }

    #[test]
    fn test_data_paths() {
        let settings = Settings {
            vault_root: PathBuf::from("/vault"),
            ..Default::default()
        };
        assert_eq!(
            settings.state_file_path(),
            PathBuf::from("/vault/.vault-index/index_state.json")
        );
        assert_eq!(
            settings.index_file_path(),
            PathBuf::from("/vault/.vault-index/content_index.jsonl")
        );
        assert_eq!(settings.tags_export_file(), PathBuf::from("/vault/Tags.md"));
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        settings.checkpoint_interval = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_model_options_respects_endpoint() {
        let mut settings = Settings {
            api_base_url: "https://api.example.com".to_string(),
            model: "zeta".to_string(),
            discovered_models: vec!["beta".to_string(), "alpha".to_string()],
            model_catalog_endpoint: "HTTPS://API.EXAMPLE.COM".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.model_options(), vec!["alpha", "beta", "zeta"]);

        settings.model_catalog_endpoint = "https://other.example.com".to_string();
        assert_eq!(settings.model_options(), vec!["zeta"]);
    }

    #[test]
    fn test_apply_model_catalog_switches_missing_model() {
        let mut settings = Settings {
            api_base_url: " https://api.example.com ".to_string(),
            model: "gone".to_string(),
            ..Default::default()
        };
        settings.apply_model_catalog(vec!["m1".to_string(), "m2".to_string()], Utc::now());
        assert_eq!(settings.model, "m1");
        assert_eq!(settings.model_catalog_endpoint, "https://api.example.com");
        assert!(settings.model_catalog_fetched_at.is_some());
        assert!(settings.model_catalog_status_text().starts_with("Cached 2 model(s)"));
    }

    #[test]
    fn test_save_roundtrip_keeps_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let settings = Settings {
            api_token: SecretString::from("sk-secret".to_string()),
            excluded_tags: vec!["private".to_string()],
            ..Default::default()
        };
        settings.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = toml::from_str(&text).unwrap();
        assert_eq!(loaded.api_token.expose_secret(), "sk-secret");
        assert_eq!(loaded.excluded_tags, vec!["private"]);
    }
}
