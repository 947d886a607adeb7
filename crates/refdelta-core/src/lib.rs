//! refdelta core: structural diff and refactoring inference between two
//! snapshots of a codebase

pub mod config;
pub mod error;
pub mod history;
pub mod index;
pub mod infer;
pub mod matcher;
pub mod model;
pub mod relationship;
pub mod result;
pub mod similarity;
pub mod source;
pub mod tree;


#[cfg(test)]
pub mod test_utils;

pub use config::{DetectorFamily, DiffConfig, InferenceConfig, MatchingConfig, SimilarityWeights};
pub use error::{ConfigError, DiffError, InvariantViolation, ParseError};
pub use history::{diff_commits, CommitDiff, CommitManifest, CommitPair};
pub use index::{IndexedTree, TreeIndex};
pub use infer::Inferencer;
pub use matcher::{Match, MatchMethod, MatchOutcome, MatchSet, NodeMatcher};
pub use model::{Location, Node, NodeId, NodeKind, Signature};
pub use relationship::{EntityRef, Relationship, RelationshipKind};
pub use result::DiffResult;
pub use source::{CstJsonPlugin, FileSet, LanguagePlugin, ParsedTree};
pub use tree::{NodeSpec, Tree, TreeBuilder};

/// Configured pipeline: Indexer, Node Matcher, Relationship Inferencer.
///
/// Holds no state between calls, so one engine can serve any number of
/// tree pairs, also from several threads at once.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    matcher: NodeMatcher,
    inferencer: Inferencer,
}

impl DiffEngine {
    pub fn new(config: DiffConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(DiffEngine {
            matcher: NodeMatcher::new(&config.matching),
            inferencer: Inferencer::new(&config.inference),
        })
    }

    /// Diff two well-formed trees. Total and deterministic.
    pub fn compute(&self, before: &Tree, after: &Tree) -> DiffResult {
        let before = IndexedTree::new(before);
        let after = IndexedTree::new(after);

        let outcome = self.matcher.run(&before, &after);
        let relationships = self.inferencer.run(&before, &after, &outcome);

        tracing::debug!(
            matches = outcome.matches.len(),
            relationships = relationships.len(),
            "Diff computed"
        );
        DiffResult::new(outcome, relationships)
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        DiffEngine {
            matcher: NodeMatcher::new(&MatchingConfig::default()),
            inferencer: Inferencer::new(&InferenceConfig::default()),
        }
    }
}

/// Diff two trees with the default configuration.
pub fn compute_diff(before: &Tree, after: &Tree) -> DiffResult {
    DiffEngine::default().compute(before, after)
}
