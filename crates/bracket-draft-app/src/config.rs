// Configuration loading and parsing (config/draft.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bracket_draft_core::{DraftOrderEntry, DraftType};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub draft: DraftConfig,
    /// Resolved path of the SQLite file holding rotation state.
    pub db_path: String,
    /// Initial draft order, editable before the draft starts.
    pub participants: Vec<ParticipantConfig>,
}

impl Config {
    /// The configured participants as draft order entries.
    pub fn draft_order(&self) -> Vec<DraftOrderEntry> {
        self.participants
            .iter()
            .map(|p| DraftOrderEntry::new(p.id.clone(), p.name.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draft.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    server: ServerConfig,
    draft: DraftSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    participants: Vec<ParticipantConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DraftSection {
    default_type: String,
    #[serde(default = "default_pick_ack_delay_ms")]
    pick_ack_delay_ms: u64,
    #[serde(default = "default_autodraft_delay_ms")]
    autodraft_delay_ms: u64,
}

fn default_pick_ack_delay_ms() -> u64 {
    1000
}

fn default_autodraft_delay_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StorageSection {
    path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParticipantConfig {
    pub id: String,
    pub name: String,
}

/// Draft timing and defaults.
#[derive(Debug, Clone)]
pub struct DraftConfig {
    pub default_type: DraftType,
    /// Delay between a pick being acknowledged and the clock advancing.
    pub pick_ack_delay: Duration,
    /// Delay between an autodraft participant coming on the clock and their
    /// pick being made.
    pub autodraft_delay: Duration,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            default_type: DraftType::Snake,
            pick_ack_delay: Duration::from_millis(default_pick_ack_delay_ms()),
            autodraft_delay: Duration::from_millis(default_autodraft_delay_ms()),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draft.toml` relative to
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("draft.toml");
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Parse and validate the contents of a draft.toml file. `path` is only used
/// for error reporting.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: DraftFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let default_type = DraftType::from_str_type(&file.draft.default_type).ok_or_else(|| {
        ConfigError::ValidationError {
            field: "draft.default_type".into(),
            message: format!(
                "must be \"snake\" or \"standard\", got {:?}",
                file.draft.default_type
            ),
        }
    })?;

    let db_path = match file.storage.path {
        Some(p) if !p.trim().is_empty() => p,
        _ => default_db_path()?,
    };

    let config = Config {
        server: file.server,
        draft: DraftConfig {
            default_type,
            pick_ack_delay: Duration::from_millis(file.draft.pick_ack_delay_ms),
            autodraft_delay: Duration::from_millis(file.draft.autodraft_delay_ms),
        },
        db_path,
        participants: file.participants,
    };

    validate(&config)?;

    Ok(config)
}

/// Create `config/draft.toml` from `defaults/draft.toml` when it is missing.
/// Returns the path written, or `None` when a config file was already there.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join("draft.toml");
    if target.is_file() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join("draft.toml");
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/draft.toml or defaults/draft.toml in {}",
                base_dir.display()
            ),
        });
    }

    let copy_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_error)?;
    }
    std::fs::copy(&source, &target).map_err(copy_error)?;
    info!("Created {} from defaults", target.display());
    Ok(Some(target))
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Creates `config/draft.toml` from the shipped default before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Rotation database inside the platform data directory.
fn default_db_path() -> Result<String, ConfigError> {
    let dirs = directories::ProjectDirs::from("", "", "bracket-draft").ok_or_else(|| {
        ConfigError::ValidationError {
            field: "storage.path".into(),
            message: "not set and no platform data directory is available".into(),
        }
    })?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::ValidationError {
        field: "storage.path".into(),
        message: format!("failed to create {}: {e}", data_dir.display()),
    })?;
    Ok(data_dir.join("rotation.db").to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = config.server.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "server.base_url".into(),
            message: format!("must start with http:// or https://, got {url:?}"),
        });
    }

    let mut seen = HashSet::new();
    for (i, p) in config.participants.iter().enumerate() {
        if p.id.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("participants[{i}].id"),
                message: "must not be empty".into(),
            });
        }
        if !seen.insert(p.id.as_str()) {
            return Err(ConfigError::ValidationError {
                field: format!("participants[{i}].id"),
                message: format!("duplicate participant id {:?}", p.id),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
