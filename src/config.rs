// Configuration loading and parsing (arena.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::board::SignalConfig;

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
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub arena: ArenaConfig,
    pub signals: SignalConfig,
    pub advisor: AdvisorConfig,
    pub credentials: CredentialsConfig,
    pub ws_port: u16,
    pub db_path: String,
    pub catalog_path: String,
}

// ---------------------------------------------------------------------------
// arena.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire arena.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ArenaFile {
    arena: ArenaConfig,
    #[serde(default)]
    signals: SignalConfig,
    advisor: AdvisorConfig,
    websocket: WebsocketSection,
    database: DatabaseSection,
    catalog: CatalogSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArenaConfig {
    pub name: String,
    pub rounds: u32,
    /// Seconds between automatic turn advances for AI seats. 0 disables the
    /// timer; turns then only advance on operator command.
    pub auto_advance_secs: u64,
    pub seats: Vec<SeatSpec>,
}

/// One `[[arena.seats]]` entry: a display name and a declared archetype
/// (or the `human` sentinel for operator-controlled seats).
#[derive(Debug, Clone, Deserialize)]
pub struct SeatSpec {
    pub name: String,
    pub archetype: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogSection {
    path: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/arena.toml` and (optionally)
/// `config/credentials.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- arena.toml (required) ---
    let arena_path = config_dir.join("arena.toml");
    let arena_text = read_file(&arena_path)?;
    let arena_file: ArenaFile =
        toml::from_str(&arena_text).map_err(|e| ConfigError::ParseError {
            path: arena_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        arena: arena_file.arena,
        signals: arena_file.signals,
        advisor: arena_file.advisor,
        credentials,
        ws_port: arena_file.websocket.port,
        db_path: arena_file.database.path,
        catalog_path: arena_file.catalog.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        // Nothing to copy; that only matters when config/ is missing too,
        // because loading will then fail.
        if config_dir.exists() {
            return Ok(vec![]);
        }
        return Err(copy_error(format!(
            "neither defaults/ nor config/ directory found in {}; \
             run from the project root or ensure defaults/ is present",
            base_dir.display()
        )));
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("failed to create config directory: {e}")))?;

    let entries = std::fs::read_dir(&defaults_dir)
        .map_err(|e| copy_error(format!("failed to read defaults directory: {e}")))?;

    let mut copied = Vec::new();
    for entry in entries {
        let source = entry
            .map_err(|e| copy_error(format!("failed to read defaults entry: {e}")))?
            .path();

        let name = match source.file_name().and_then(|n| n.to_str()) {
            Some(name) if source.is_file() && !name.ends_with(".example") => name,
            _ => continue,
        };

        let target = config_dir.join(name);
        if copy_if_absent(&source, &target)? {
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Copy `source` to `target` unless `target` already exists. `create_new`
/// makes the existence check and the create one atomic step, so two
/// processes racing first-run setup cannot clobber each other.
fn copy_if_absent(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(copy_error(format!(
                "failed to create {}: {e}",
                target.display()
            )))
        }
    };

    let content = std::fs::read(source)
        .map_err(|e| copy_error(format!("failed to read {}: {e}", source.display())))?;
    std::io::Write::write_all(&mut dest, &content)
        .map_err(|e| copy_error(format!("failed to write {}: {e}", target.display())))?;
    Ok(true)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Convenience wrapper: loads config relative to the current working
/// directory, falling back to the platform config directory (via
/// `directories`) when the cwd carries neither config/ nor defaults/ --
/// the installed-binary case.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;

    if cwd.join("config").exists() || cwd.join("defaults").exists() {
        ensure_config_files(&cwd)?;
        return load_config_from(&cwd);
    }

    let Some(dirs) = directories::ProjectDirs::from("", "", "draft-arena") else {
        return Err(ConfigError::FileNotFound {
            path: cwd.join("config/arena.toml"),
        });
    };
    let base = dirs.config_dir().to_path_buf();
    ensure_config_files(&base)?;
    load_config_from(&base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.arena.rounds == 0 {
        return Err(ConfigError::ValidationError {
            field: "arena.rounds".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.arena.seats.len() < 2 {
        return Err(ConfigError::ValidationError {
            field: "arena.seats".into(),
            message: format!(
                "a draft needs at least 2 seats, got {}",
                config.arena.seats.len()
            ),
        });
    }

    for (i, seat) in config.arena.seats.iter().enumerate() {
        if seat.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("arena.seats[{i}].name"),
                message: "must not be empty".into(),
            });
        }
        if seat.archetype.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("arena.seats[{i}].archetype"),
                message: "must not be empty (use \"human\" for operator seats)".into(),
            });
        }
    }

    if config.signals.run_window == 0 {
        return Err(ConfigError::ValidationError {
            field: "signals.run_window".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.signals.run_min_count == 0 {
        return Err(ConfigError::ValidationError {
            field: "signals.run_min_count".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.advisor.max_tokens == 0 {
        return Err(ConfigError::ValidationError {
            field: "advisor.max_tokens".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.catalog_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "catalog.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
