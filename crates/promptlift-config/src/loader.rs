//! Reads `promptlift.toml` into a [`Config`].
//!
//! Values may reference the environment as `${NAME}` or `${NAME:-fallback}`.
//! Substitution happens on the raw text before TOML parsing, so references
//! work inside any string value. Paths (`storage.path`, `logging.directory`)
//! get `~` expanded after parsing.

use std::path::{Path, PathBuf};

use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::schema::Config;

const ENV_REF: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}";

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::load_str(&raw)
    }

    /// Like [`load`](Self::load), but a missing file yields `Config::default()`.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(missing)) => {
                tracing::debug!("no config at {}, using defaults", missing.display());
                Ok(Config::default())
            }
            other => other,
        }
    }

    pub fn load_str(raw: &str) -> Result<Config, ConfigError> {
        let mut config: Config = toml::from_str(&substitute_env(raw)?)?;

        config.storage.path = expand_buf(&config.storage.path);
        config.logging.directory = config.logging.directory.as_deref().map(expand_buf);
        Ok(config)
    }

    /// `~/x` to `$HOME/x`; anything else is returned as is.
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }
}

fn expand_buf(path: &Path) -> PathBuf {
    PathBuf::from(ConfigLoader::expand_path(&path.to_string_lossy()))
}

fn substitute_env(raw: &str) -> Result<String, ConfigError> {
    let pattern = Regex::new(ENV_REF)?;
    let mut missing = None;
    let out = pattern.replace_all(raw, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (std::env::var(name), caps.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(fallback)) => fallback.as_str().to_string(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(ConfigError::UnsetVariable(name)),
        None => Ok(out.into_owned()),
    }
}
