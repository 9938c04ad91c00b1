use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::parser::UnknownKindPolicy;

use super::helpers::{expand_tilde, fetch_text, is_remote_source};
use super::subscription::Profile;

// ============================================================================
// Generator Config Types
// ============================================================================

/// What to do with a profile whose outbounds have validation violations
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViolationPolicy {
    /// Log the violations and still write the payload
    #[default]
    Warn,
    /// Log the violations and write nothing for the profile
    Reject,
}

/// Generator configuration parsed from TOML file
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GeneratorConfig {
    /// Directory receiving one payload file per profile, default "./out"
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Handling of validation violations
    #[serde(default)]
    pub on_violation: ViolationPolicy,

    /// Handling of proxy entries whose `type` has no decoder
    #[serde(default)]
    pub unknown_kind: UnknownKindPolicy,

    /// Report outbounds sharing a tag as violations
    #[serde(default = "default_true")]
    pub check_duplicate_tags: bool,

    /// Pretty-print payload JSON
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Profiles list (required - at least one)
    pub profiles: Vec<Profile>,
}

// ============================================================================
// Generator Config Implementation
// ============================================================================

impl GeneratorConfig {
    /// Parse generator config from TOML string
    ///
    /// Profiles must have non-empty names that map to distinct output files.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GeneratorConfig =
            toml::from_str(content).context("Failed to parse generator config TOML")?;

        if config.profiles.is_empty() {
            anyhow::bail!("At least one profile is required");
        }

        let mut seen = HashSet::new();
        for profile in &config.profiles {
            if profile.name.trim().is_empty() {
                anyhow::bail!("Profile name must not be empty (source: {})", profile.source);
            }
            let file_name = profile.output_file_name();
            if !seen.insert(file_name.clone()) {
                anyhow::bail!(
                    "Duplicate profile output: '{}' writes {} which an earlier profile already writes",
                    profile.name,
                    file_name
                );
            }
        }

        Ok(config)
    }

    /// Load generator config from file path
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read generator config from {:?}", path))?;
        Self::from_toml(&content)
    }

    /// Load generator config from file path or URL
    pub async fn load(path_or_url: &str) -> Result<Self> {
        if is_remote_source(path_or_url) {
            Self::from_url(path_or_url).await
        } else {
            let expanded = expand_tilde(path_or_url);
            Self::from_file(Path::new(&expanded)).await
        }
    }

    /// Load generator config from URL
    pub async fn from_url(url: &str) -> Result<Self> {
        let content = fetch_text(url).await?;
        Self::from_toml(&content)
    }
}

fn default_output_dir() -> String {
    "./out".to_string()
}

fn default_true() -> bool {
    true
}
