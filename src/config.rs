//! Grading policy knobs, read from an optional TOML file.
//!
//! Weights, maximum scores and the presentation calendar are part of the
//! course definition and are not configurable here.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GradingConfig {
    /// Incoming reviews every team should receive
    pub reviews_per_team: usize,
    /// Peer scores this many std-devs from the mean are dropped
    pub outlier_threshold: f64,
    /// Author diversity credited to a lone committer on a one-person team
    pub solo_diversity_credit: f64,
    /// Final grade below which a student is listed as failing
    pub passing_grade: f64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            reviews_per_team: 3,
            outlier_threshold: 2.0,
            solo_diversity_credit: 0.2,
            passing_grade: 60.0,
        }
    }
}

impl GradingConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        let config: GradingConfig = toml::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(?config, path = %path.display(), "loaded grading config");
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
