use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use thiserror::Error;
use toml::{Table, Value};

const DEFAULTS: &str = include_str!("../../config/default.toml");

/// Directory name used for config, data and cache locations.
pub const APP_DIR: &str = "mk-processor";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("built-in configuration defaults are invalid: {0}")]
    Defaults(#[source] toml::de::Error),
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Read-only key-path lookup. Implementations never fail: a missing key is
/// reported as `None` and the caller falls back to its own default.
pub trait ConfigAccessor {
    fn value(&self, section: &str, key: &str) -> Option<Value>;
}

/// Typed lookups with caller-supplied defaults.
pub trait ConfigExt: ConfigAccessor {
    fn get<T: DeserializeOwned>(&self, section: &str, key: &str, default: T) -> T {
        let Some(value) = self.value(section, key) else {
            return default;
        };

        match value.try_into() {
            Ok(typed) => typed,
            Err(err) => {
                tracing::warn!(section, key, "config value has unexpected type: {err}");
                default
            }
        }
    }
}

impl<C: ConfigAccessor + ?Sized> ConfigExt for C {}

/// Layered configuration: embedded defaults, then the user's `config.toml`.
///
/// The user layer is live. Each lookup checks the file's modification time
/// and re-reads it when it changed, so values read later in a session
/// reflect edits made after startup.
#[derive(Debug)]
pub struct AppConfig {
    defaults: Table,
    user_path: Option<PathBuf>,
    user: RefCell<UserLayer>,
}

#[derive(Debug, Default)]
struct UserLayer {
    table: Table,
    modified: Option<SystemTime>,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self, ConfigError> {
        let user_path = project_dirs().map(|dirs| dirs.config_dir().join("config.toml"));
        Self::load_from(DEFAULTS, user_path)
    }

    pub fn load_from(defaults: &str, user_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let defaults: Table = toml::from_str(defaults).map_err(ConfigError::Defaults)?;

        let user = match user_path.as_deref() {
            Some(path) if path.exists() => read_layer(path)?,
            _ => UserLayer::default(),
        };

        Ok(Self {
            defaults,
            user_path,
            user: RefCell::new(user),
        })
    }

    pub fn user_path(&self) -> Option<&Path> {
        self.user_path.as_deref()
    }

    fn refresh(&self) {
        let Some(path) = self.user_path.as_deref() else {
            return;
        };

        let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok();
        if modified == self.user.borrow().modified {
            return;
        }

        if modified.is_none() {
            tracing::info!(path = %path.display(), "user config removed; using defaults");
            *self.user.borrow_mut() = UserLayer::default();
            return;
        }

        match read_layer(path) {
            Ok(layer) => {
                tracing::debug!(path = %path.display(), "user config reloaded");
                *self.user.borrow_mut() = layer;
            }
            Err(err) => {
                tracing::warn!("keeping previous configuration: {err}");
                self.user.borrow_mut().modified = modified;
            }
        }
    }
}

impl ConfigAccessor for AppConfig {
    fn value(&self, section: &str, key: &str) -> Option<Value> {
        self.refresh();

        lookup(&self.user.borrow().table, section, key)
            .or_else(|| lookup(&self.defaults, section, key))
    }
}

fn lookup(table: &Table, section: &str, key: &str) -> Option<Value> {
    table
        .get(section)
        .and_then(Value::as_table)
        .and_then(|section| section.get(key))
        .cloned()
}

fn read_layer(path: &Path) -> Result<UserLayer, ConfigError> {
    let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(UserLayer { table, modified })
}

pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_DIR)
}

/// Expand `~` or a leading `~/` to the user's home directory. Other `~user`
/// forms are left as they are.
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match directories::BaseDirs::new() {
        Some(base_dirs) => base_dirs.home_dir().join(rest),
        None => PathBuf::from(path),
    }
}
