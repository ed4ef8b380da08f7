//! Project settings file written by `init` and read by the deploy commands.
//!
//! The file is a flat JSON object kept in the project root. Only loading,
//! saving and validation live here; prompting for the values and talking to
//! the cloud are handled elsewhere.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Settings file name, relative to the project root.
pub const SETTINGS_FILE: &str = "yappa_settings.json";

pub const DEFAULT_REQUIREMENTS_FILE: &str = "requirements.txt";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    /// Also used as the function name.
    pub project_name: String,
    /// Runtime identifier, e.g. `python38`.
    pub runtime: String,
    /// Object storage credentials profile.
    pub profile: Option<String>,
    #[serde(default = "default_requirements_file")]
    pub requirements_file: String,
    pub bucket: String,
    /// Path to the application object, e.g. `app.app`.
    pub entrypoint: String,
}

fn default_requirements_file() -> String {
    DEFAULT_REQUIREMENTS_FILE.to_string()
}

impl Settings {
    /// Reads and validates settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds invalid settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes the settings to a new file at `path`, indented with four spaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid, the file already exists,
    /// or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .context("Failed to serialize settings")?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .with_context(|| format!("{} already exists or cannot be created", path.display()))?;
        file.write_all(&buffer)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            bail!("project_name must not be empty");
        }
        if self.entrypoint.trim().is_empty() {
            bail!("entrypoint must not be empty");
        }
        if !is_valid_bucket_name(&self.bucket) {
            bail!("Invalid bucket name '{}'", self.bucket);
        }
        Ok(())
    }
}

/// Checks a bucket name against the S3-compatible naming rules.
#[must_use]
pub fn is_valid_bucket_name(name: &str) -> bool {
    // 3 to 63 characters
    if !(3..=63).contains(&name.chars().count()) {
        return false;
    }
    if name.chars().any(|c| c.is_uppercase() || c == '_') {
        return false;
    }

    let starts_and_ends_well = |label: &str| {
        let lower_or_digit = |c: char| c.is_lowercase() || c.is_ascii_digit();
        label.chars().next().is_some_and(lower_or_digit)
            && label.chars().next_back().is_some_and(lower_or_digit)
    };
    if !name.split('.').all(starts_and_ends_well) {
        return false;
    }

    // must not look like an IP address
    !name
        .split('.')
        .all(|label| label.chars().all(|c| c.is_ascii_digit()))
}
