use serde::{Deserialize, Serialize};

use super::helpers::{is_remote_source, sanitize_file_name};

// ============================================================================
// Profile Types
// ============================================================================

/// A named subscription profile: where its YAML text comes from
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    /// Name/identifier for this profile; names the output file
    pub name: String,

    /// File path or http(s) URL of the subscription text
    pub source: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Whether the source is fetched over HTTP rather than read from disk
    pub fn is_remote(&self) -> bool {
        is_remote_source(&self.source)
    }

    /// File name of this profile's payload
    pub fn output_file_name(&self) -> String {
        format!("{}.json", sanitize_file_name(&self.name))
    }
}
