//! Matching and inference configuration
//!
//! The weights and thresholds are empirically tuned values. They are kept
//! here, passed explicitly into the matcher and inferencer, and can be read
//! from a TOML file:
//!
//! ```toml
//! [matching]
//! same_container_threshold = 0.5
//! move_threshold = 0.7
//!
//! [matching.weights]
//! name = 0.25
//! signature = 0.15
//! body = 0.6
//!
//! [inference]
//! extract_min_overlap = 0.5
//! inline_min_overlap = 0.5
//! sibling_min_similarity = 0.7
//! priority = ["ExtractInline", "Hierarchy", "Supertype", "Plain"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DiffError};

/// Relative weights of the three similarity components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub name: f64,
    pub signature: f64,
    pub body: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            name: 0.25,
            signature: 0.15,
            body: 0.60,
        }
    }
}

/// Node matcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub weights: SimilarityWeights,
    /// Minimum similarity for Phase 2 (same container).
    pub same_container_threshold: f64,
    /// Minimum similarity for Phase 3 (cross container).
    pub move_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            same_container_threshold: 0.5,
            move_threshold: 0.7,
        }
    }
}

/// Groups of relationship detectors that compete for the same evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DetectorFamily {
    /// Extract, Extract-and-Move and Inline operations.
    ExtractInline,
    /// Pull Up and Push Down of operations and attributes.
    Hierarchy,
    /// Extract Superclass and Extract Interface.
    Supertype,
    /// Rename, Move, Move-and-Rename and Change Signature.
    Plain,
}

impl DetectorFamily {
    pub const ALL: [DetectorFamily; 4] = [
        DetectorFamily::ExtractInline,
        DetectorFamily::Hierarchy,
        DetectorFamily::Supertype,
        DetectorFamily::Plain,
    ];
}

/// Relationship inferencer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Minimum share of an extracted method's body that must come from the
    /// tokens removed from its caller.
    pub extract_min_overlap: f64,
    /// Minimum share of an inlined method's body that must reappear in the
    /// tokens added to its caller.
    pub inline_min_overlap: f64,
    /// Minimum body similarity between a member moved along a hierarchy and
    /// each further copy of it that the injective matcher left unmatched.
    pub sibling_min_similarity: f64,
    /// Order in which detector families claim evidence; earlier wins.
    pub priority: Vec<DetectorFamily>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            extract_min_overlap: 0.5,
            inline_min_overlap: 0.5,
            sibling_min_similarity: 0.7,
            priority: DetectorFamily::ALL.to_vec(),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DiffConfig {
    pub matching: MatchingConfig,
    pub inference: InferenceConfig,
}

impl DiffConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: DiffConfig =
            toml::from_str(source).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, DiffError> {
        let source = std::fs::read_to_string(path).map_err(|source| DiffError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(Self::from_toml_str(&source)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = &self.matching.weights;
        for (name, value) in [
            ("name", weights.name),
            ("signature", weights.signature),
            ("body", weights.body),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }
        if weights.name + weights.signature + weights.body <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        if weights.name + weights.signature <= 0.0 {
            return Err(ConfigError::BodyOnlyWeights);
        }

        for (name, value) in [
            ("same_container_threshold", self.matching.same_container_threshold),
            ("move_threshold", self.matching.move_threshold),
            ("extract_min_overlap", self.inference.extract_min_overlap),
            ("inline_min_overlap", self.inference.inline_min_overlap),
            ("sibling_min_similarity", self.inference.sibling_min_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.matching.move_threshold < self.matching.same_container_threshold {
            return Err(ConfigError::MoveBelowSameContainer {
                moving: self.matching.move_threshold,
                same_container: self.matching.same_container_threshold,
            });
        }

        let mut priority = self.inference.priority.clone();
        priority.sort();
        priority.dedup();
        if priority.len() != DetectorFamily::ALL.len()
            || self.inference.priority.len() != DetectorFamily::ALL.len()
        {
            return Err(ConfigError::InvalidPriority);
        }

        Ok(())
    }
}
