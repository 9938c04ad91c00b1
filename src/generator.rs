//! Payload generator module
//!
//! This module runs the caller side of the core: it loads each configured
//! subscription profile, decodes and validates it, applies the violation
//! policy and writes one latency payload file per profile.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::validation::{ValidationResult, check_unique_tags, validate_outbounds};
use crate::contract::{LatencyInitPayload, to_payload};
use crate::parser::{DecoderRegistry, ParseError, parse_subscription_with_registry};

// Sub-modules
pub mod generator_config;
pub mod helpers;
pub mod subscription;

// Re-exports
pub use generator_config::{GeneratorConfig, ViolationPolicy};
pub use helpers::{expand_tilde, fetch_text, load_text, sanitize_file_name};
pub use subscription::Profile;

// ============================================================================
// Profile Build
// ============================================================================

/// The payload of one subscription together with its violations
#[derive(Debug)]
pub struct ProfileBuild {
    pub payload: LatencyInitPayload,
    pub validation: ValidationResult,
}

/// Decodes, validates and maps one subscription text.
///
/// Validation never removes outbounds: the payload always carries every
/// decoded entry and the caller decides what the violations mean.
pub fn build_profile(content: &str, config: &GeneratorConfig) -> Result<ProfileBuild, ParseError> {
    let registry =
        DecoderRegistry::with_builtin_decoders().with_unknown_kind_policy(config.unknown_kind);
    let outbounds = parse_subscription_with_registry(content, &registry)?;

    let mut validation = validate_outbounds(&outbounds);
    if config.check_duplicate_tags {
        validation.extend(check_unique_tags(&outbounds));
    }

    Ok(ProfileBuild {
        payload: to_payload(&outbounds),
        validation,
    })
}

// ============================================================================
// Generation Report
// ============================================================================

/// What happened to one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// Payload written to `path`
    Written { path: PathBuf, outbounds: usize },
    /// Violations found under the reject policy; nothing written
    Rejected { violations: usize },
}

/// Profile names by outcome, each list sorted
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub written: Vec<String>,
    pub rejected: Vec<String>,
    pub failed: Vec<String>,
}

impl GenerationReport {
    /// At least one profile produced a payload
    pub fn is_success(&self) -> bool {
        !self.written.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.rejected.len() + self.failed.len()
    }

    fn record(&mut self, name: String, outcome: &Result<ProfileOutcome>) {
        match outcome {
            Ok(ProfileOutcome::Written { .. }) => self.written.push(name),
            Ok(ProfileOutcome::Rejected { .. }) => self.rejected.push(name),
            Err(_) => self.failed.push(name),
        }
    }

    fn sort(&mut self) {
        self.written.sort();
        self.rejected.sort();
        self.failed.sort();
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Generator that processes every configured profile
pub struct Generator {
    config: Arc<GeneratorConfig>,
}

impl Generator {
    /// Create a new generator with the given config
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Load generator from path or URL
    pub async fn load(path_or_url: &str) -> Result<Self> {
        let config = GeneratorConfig::load(path_or_url).await?;
        Ok(Self::new(config))
    }

    /// Replace the configured output directory
    pub fn with_output_dir(self, output_dir: impl Into<String>) -> Self {
        let mut config = Arc::unwrap_or_clone(self.config);
        config.output_dir = output_dir.into();
        Self::new(config)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Process all profiles concurrently and report per-profile outcomes.
    ///
    /// A failing profile never stops the others; only an unusable output
    /// directory fails the whole run.
    pub async fn run(&self) -> Result<GenerationReport> {
        let output_dir = PathBuf::from(expand_tilde(&self.config.output_dir));
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

        info!(
            "Processing {} profile(s) into {:?}",
            self.config.profiles.len(),
            output_dir
        );

        let mut tasks = JoinSet::new();
        for profile in self.config.profiles.iter().cloned() {
            let config = Arc::clone(&self.config);
            let output_dir = output_dir.clone();
            tasks.spawn(async move {
                let outcome = process_profile(&config, &profile, &output_dir).await;
                (profile.name, outcome)
            });
        }

        let mut report = GenerationReport::default();
        while let Some(joined) = tasks.join_next().await {
            let (name, outcome) = joined.context("Profile task terminated abnormally")?;
            match &outcome {
                Ok(ProfileOutcome::Written { path, outbounds }) => {
                    info!("[{}] Wrote {} outbounds to {:?}", name, outbounds, path);
                }
                Ok(ProfileOutcome::Rejected { violations }) => {
                    warn!(
                        "[{}] Rejected with {} violation(s), nothing written",
                        name, violations
                    );
                }
                Err(e) => error!("[{}] Failed: {:#}", name, e),
            }
            report.record(name, &outcome);
        }
        report.sort();

        info!(
            "Generation finished: {} written, {} rejected, {} failed",
            report.written.len(),
            report.rejected.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

async fn process_profile(
    config: &GeneratorConfig,
    profile: &Profile,
    output_dir: &Path,
) -> Result<ProfileOutcome> {
    debug!("[{}] Loading subscription from {}", profile.name, profile.source);
    let content = load_text(&profile.source)
        .await
        .with_context(|| format!("Failed to load profile '{}'", profile.name))?;

    let build = build_profile(&content, config)
        .with_context(|| format!("Failed to parse profile '{}'", profile.name))?;

    if build.validation.has_errors() {
        warn!(
            "[{}] {} validation violation(s)",
            profile.name,
            build.validation.violation_count()
        );
        build.validation.log_violations();

        if config.on_violation == ViolationPolicy::Reject {
            return Ok(ProfileOutcome::Rejected {
                violations: build.validation.violation_count(),
            });
        }
    }

    if build.payload.outbounds.is_empty() {
        warn!("[{}] Subscription produced no outbounds", profile.name);
    }

    let serialized = if config.pretty {
        build.payload.to_json_pretty()
    } else {
        build.payload.to_json()
    };
    let json = serialized.context("Failed to serialize payload to JSON")?;

    let path = output_dir.join(profile.output_file_name());
    tokio::fs::write(&path, &json)
        .await
        .with_context(|| format!("Failed to write payload to {:?}", path))?;

    Ok(ProfileOutcome::Written {
        path,
        outbounds: build.payload.outbounds.len(),
    })
}
