//! Errors raised while reading `promptlift.toml`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested file does not exist. `load_or_default` treats this as "use defaults".
    #[error("config file {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `${NAME}` reference with no default and no value in the environment.
    #[error("${{{0}}} is referenced but not set in the environment")]
    UnsetVariable(String),

    #[error("bad substitution pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("malformed TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_file() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/promptlift.toml"));
        assert_eq!(err.to_string(), "config file /etc/promptlift.toml does not exist");
    }

    #[test]
    fn unset_variable_shows_reference() {
        let err = ConfigError::UnsetVariable("PROMPTLIFT_API_KEY".into());
        assert!(err.to_string().starts_with("${PROMPTLIFT_API_KEY}"));
    }

    #[test]
    fn read_error_keeps_source() {
        let err = ConfigError::Read {
            path: PathBuf::from("promptlift.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
