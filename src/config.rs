//! Application configuration.
//!
//! Settings are layered with `figment`, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `--config <PATH>`, else `./vaultdigest.toml`, else
//!    `config.toml` in the platform config directory
//! 3. `VAULTDIGEST_*` environment variables (`VAULTDIGEST_VAULT_PATH`, ...)
//!
//! CLI flags that affect a single run (`--since`, `--dry-run`) are applied on
//! top by the caller and never written back.
//!
//! The Anthropic API key is deliberately not a field here; it is read from
//! `ANTHROPIC_API_KEY` when the transformer is built.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::{BaseDirs, ProjectDirs};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::DiscoveryConfig;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vaultdigest.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "VAULTDIGEST_";

/// Which transformation service to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LlmBackend {
    /// Anthropic Messages API.
    #[default]
    Anthropic,
    /// OpenAI-compatible server at `local_base_url`.
    Local,
}

impl LlmBackend {
    /// Accepted spellings.
    pub const NAMES: &'static [&'static str] = &["anthropic", "claude", "local"];

    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "local" => Ok(Self::Local),
            other => Err(ConfigError::UnknownBackend {
                value: other.to_string(),
                suggestion: suggest(other, Self::NAMES).map(str::to_string),
            }),
        }
    }
}

impl TryFrom<String> for LlmBackend {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LlmBackend> for String {
    fn from(backend: LlmBackend) -> Self {
        backend.as_str().to_string()
    }
}

/// Errors raised while loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    /// A provider failed or a value had the wrong type.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// `vault_path` was not set anywhere.
    #[error("vault_path is required (set it in the config file or VAULTDIGEST_VAULT_PATH)")]
    MissingVaultPath,

    /// `vault_path` does not exist.
    #[error("Vault not found: {0}")]
    VaultNotFound(PathBuf),

    /// `vault_path` is not a directory.
    #[error("Vault is not a directory: {0}")]
    VaultNotADirectory(PathBuf),

    /// `llm_backend` names no known backend.
    #[error("Unknown llm_backend '{value}'{}", did_you_mean(.suggestion))]
    UnknownBackend {
        /// Value as configured
        value: String,
        /// Closest known backend, if any is close
        suggestion: Option<String>,
    },

    /// The local backend was selected without a server URL.
    #[error("llm_backend is 'local' but local_base_url is not set")]
    MissingLocalBaseUrl,

    /// A value is out of range.
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the notes vault. Required.
    pub vault_path: PathBuf,
    /// Folders (relative to the vault) to restrict discovery to.
    pub include_folders: Vec<String>,
    /// Glob patterns (relative to the vault) to exclude.
    pub exclude_globs: Vec<String>,
    /// Note extensions to collect.
    pub extensions: Vec<String>,
    /// Folder (relative to the vault) digests are written to.
    pub digest_folder: String,
    /// Characters of each note sent for summarization.
    pub max_input_chars: usize,
    /// Summary cache directory.
    pub cache_dir: PathBuf,
    /// Checkpoint file.
    pub state_path: PathBuf,
    /// Fixed cutoff that takes priority over the checkpoint.
    pub since_iso: Option<String>,
    /// Transformation backend.
    pub llm_backend: LlmBackend,
    /// Model for the Anthropic backend.
    pub claude_model: String,
    /// Base URL of the OpenAI-compatible server, e.g. `http://localhost:1234/v1`.
    pub local_base_url: Option<String>,
    /// Model for the local backend.
    pub local_model: String,
    /// Per-request timeout in seconds.
    pub llm_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: PathBuf::new(),
            include_folders: Vec::new(),
            exclude_globs: Vec::new(),
            extensions: vec!["md".to_string()],
            digest_folder: "Daily Digests".to_string(),
            max_input_chars: 16_000,
            cache_dir: PathBuf::from(".cache/summaries"),
            state_path: PathBuf::from("state.json"),
            since_iso: None,
            llm_backend: LlmBackend::Anthropic,
            claude_model: "claude-sonnet-4-6".to_string(),
            local_base_url: None,
            local_model: "llama-3.2-3b-instruct".to_string(),
            llm_timeout_secs: 60,
        }
    }
}

/// Every key [`Config`] understands, for unknown-key suggestions.
const KNOWN_KEYS: &[&str] = &[
    "vault_path",
    "include_folders",
    "exclude_globs",
    "extensions",
    "digest_folder",
    "max_input_chars",
    "cache_dir",
    "state_path",
    "since_iso",
    "llm_backend",
    "claude_model",
    "local_base_url",
    "local_model",
    "llm_timeout_secs",
];

impl Config {
    /// Load configuration from defaults, the config file and the environment,
    /// then validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if `explicit` does not exist, and
    /// any load or validation error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()))
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover_file(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(ref path) = file {
            log::debug!("Loading configuration from {}", path.display());
            warn_unknown_keys(path);
            figment = figment.merge(Toml::file(path));
        } else {
            log::debug!("No config file found, using defaults and environment");
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(&figment)
    }

    /// Extract and validate a configuration from an assembled figment.
    ///
    /// # Errors
    ///
    /// Returns any extraction or validation error.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract()?;
        config.vault_path = expand_tilde(&config.vault_path);
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints and that the vault exists.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vault_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingVaultPath);
        }
        if !self.vault_path.exists() {
            return Err(ConfigError::VaultNotFound(self.vault_path.clone()));
        }
        if !self.vault_path.is_dir() {
            return Err(ConfigError::VaultNotADirectory(self.vault_path.clone()));
        }
        if self.max_input_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "max_input_chars",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.llm_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "llm_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.llm_backend == LlmBackend::Local
            && self
                .local_base_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::MissingLocalBaseUrl);
        }
        Ok(())
    }

    /// Discovery filters derived from this configuration.
    #[must_use]
    pub fn discovery(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            include_folders: self.include_folders.clone(),
            exclude_globs: self.exclude_globs.clone(),
            extensions: self.extensions.clone(),
        }
    }

    /// First config file found when none is given explicitly.
    fn discover_file() -> Option<PathBuf> {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::platform_config_path().filter(|p| p.is_file())
    }

    /// `config.toml` in the platform-specific config directory.
    #[must_use]
    pub fn platform_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "vaultdigest", "vaultdigest")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Replace a leading `~` with the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

/// Closest candidate to `input`, if one is within two edits.
fn suggest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (strsim::levenshtein(input, c), *c))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, c)| c)
}

/// Log a warning for every top-level key the file sets that [`Config`]
/// does not know.
fn warn_unknown_keys(path: &Path) {
    let Ok(table) =
        Figment::from(Toml::file(path)).extract::<BTreeMap<String, figment::value::Value>>()
    else {
        return;
    };
    for key in unknown_keys(table.keys().map(String::as_str)) {
        match suggest(key, KNOWN_KEYS) {
            Some(s) => log::warn!("Unknown config key '{}' (did you mean '{}'?)", key, s),
            None => log::warn!("Unknown config key '{}'", key),
        }
    }
}

fn unknown_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    keys.filter(|k| !KNOWN_KEYS.contains(k)).collect()
}
