//! Adapter configuration read from the function's environment variables.

use anyhow::{Result, bail};
use std::str::FromStr;

/// Environment variable selecting how response chunks become the body.
pub const BODY_MODE_VAR: &str = "YAPPA_BODY_MODE";

/// How the application's body chunks are turned into the response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyMode {
    /// Only the first chunk is used; later chunks are dropped.
    #[default]
    FirstChunk,
    /// All chunks are concatenated.
    Joined,
}

impl FromStr for BodyMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first-chunk" | "first_chunk" => Ok(Self::FirstChunk),
            "joined" | "join" => Ok(Self::Joined),
            other => bail!("Unknown body mode '{other}', expected 'first-chunk' or 'joined'"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    pub body_mode: BodyMode,
}

impl AdapterConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unsupported value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, unset variables keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unsupported value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let body_mode = match lookup(BODY_MODE_VAR) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => BodyMode::default(),
        };

        Ok(Self { body_mode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = AdapterConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.body_mode, BodyMode::FirstChunk);
    }

    #[test]
    fn test_joined_body_mode() {
        let config = AdapterConfig::from_lookup(|key| {
            (key == BODY_MODE_VAR).then(|| "Joined".to_string())
        })
        .unwrap();
        assert_eq!(config.body_mode, BodyMode::Joined);
    }

    #[test]
    fn test_blank_value_uses_default() {
        let config = AdapterConfig::from_lookup(|_| Some("  ".to_string())).unwrap();
        assert_eq!(config.body_mode, BodyMode::FirstChunk);
    }

    #[test]
    fn test_unknown_body_mode_is_an_error() {
        let result = AdapterConfig::from_lookup(|_| Some("streaming".to_string()));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Unknown body mode 'streaming'"));
    }
}
