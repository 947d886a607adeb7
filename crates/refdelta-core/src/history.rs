//! Batch diffs over commit pairs
//!
//! The core keeps no state between diffs, so independent commits are
//! processed in parallel on the rayon pool. Results keep the input order.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DiffError, Result};
use crate::result::DiffResult;
use crate::source::LanguagePlugin;
use crate::tree::Tree;
use crate::DiffEngine;

/// Before and after trees of one commit.
#[derive(Debug, Clone)]
pub struct CommitPair {
    pub commit: String,
    pub before: Tree,
    pub after: Tree,
}

/// Diff of one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDiff {
    pub commit: String,
    pub result: DiffResult,
}

/// Diff every pair, in parallel, returning results in input order.
pub fn diff_commits(engine: &DiffEngine, pairs: &[CommitPair]) -> Vec<CommitDiff> {
    let diffs: Vec<CommitDiff> = pairs
        .par_iter()
        .map(|pair| {
            debug!(commit = %pair.commit, "Diffing commit");
            CommitDiff {
                commit: pair.commit.clone(),
                result: engine.compute(&pair.before, &pair.after),
            }
        })
        .collect();

    info!(commits = diffs.len(), "Batch diff complete");
    diffs
}

/// JSON list of commits with their before and after snapshot locations.
/// Relative paths are resolved against the manifest's directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitManifest {
    pub commits: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub commit: String,
    pub before: PathBuf,
    pub after: PathBuf,
}

impl CommitManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DiffError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: CommitManifest = serde_json::from_str(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for entry in &mut manifest.commits {
            entry.before = base.join(&entry.before);
            entry.after = base.join(&entry.after);
        }
        Ok(manifest)
    }

    /// Build every snapshot with `plugin`. Parse warnings are logged and the
    /// partial trees kept.
    pub fn resolve(&self, plugin: &dyn LanguagePlugin) -> Result<Vec<CommitPair>> {
        self.commits
            .par_iter()
            .map(|entry| {
                let before = plugin.load_snapshot(&entry.before)?;
                let after = plugin.load_snapshot(&entry.after)?;
                for warning in before.warnings.iter().chain(&after.warnings) {
                    tracing::warn!(commit = %entry.commit, "{warning}");
                }
                Ok(CommitPair {
                    commit: entry.commit.clone(),
                    before: before.tree,
                    after: after.tree,
                })
            })
            .collect()
    }
}
