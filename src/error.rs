//! Error types surfaced by level loading and level changes.
//!
//! Per-frame gameplay has no failure paths; everything that can go wrong happens while reading the
//! catalog, preloading assets, or switching levels.

use std::fmt;

/// A declared asset could not be read or decoded. Fatal during preloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLoadError {
    pub path: String,
    pub reason: String,
}

impl AssetLoadError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AssetLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load asset '{}': {}", self.path, self.reason)
    }
}

impl std::error::Error for AssetLoadError {}

/// The level catalog is malformed, or a request referenced something the catalog does not define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No level with this identifier exists in the catalog.
    UnknownLevel(String),
    /// The catalog could not be read or parsed.
    Malformed(String),
    /// The catalog parsed but describes something unusable.
    Invalid(String),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownLevel(id) => write!(f, "unknown level identifier '{id}'"),
            Self::Malformed(reason) => write!(f, "malformed level catalog: {reason}"),
            Self::Invalid(reason) => write!(f, "invalid level catalog: {reason}"),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<serde_json::Error> for ConfigurationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_names_the_identifier() {
        let err = ConfigurationError::UnknownLevel("level9".to_owned());
        assert_eq!(err.to_string(), "unknown level identifier 'level9'");
    }

    #[test]
    fn asset_error_mentions_path_and_reason() {
        let err = AssetLoadError::new("images/missing.png", "file not found");
        let message = err.to_string();
        assert!(message.contains("images/missing.png"));
        assert!(message.contains("file not found"));
    }

    #[test]
    fn json_errors_become_malformed() {
        let err: ConfigurationError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigurationError::Malformed(_)));
    }
}
