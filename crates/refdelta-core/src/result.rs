//! Immutable output of one before/after diff

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::matcher::{Match, MatchMethod, MatchOutcome};
use crate::model::NodeId;
use crate::relationship::{Relationship, RelationshipKind};

/// Node correspondences and inferred relationships for one tree pair.
///
/// Matches are ordered by before id; relationships by kind, then before
/// names, then after names. Two diffs of the same trees serialize to the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub matches: Vec<Match>,
    pub relationships: Vec<Relationship>,
    pub unmatched_before: Vec<NodeId>,
    pub unmatched_after: Vec<NodeId>,
}

impl DiffResult {
    pub(crate) fn new(outcome: MatchOutcome, mut relationships: Vec<Relationship>) -> Self {
        relationships.sort_by(|x, y| {
            x.sort_key()
                .cmp(&y.sort_key())
                .then_with(|| x.before.cmp(&y.before))
                .then_with(|| x.after.cmp(&y.after))
                .then_with(|| y.confidence.total_cmp(&x.confidence))
        });
        relationships.dedup_by(|x, y| x.kind == y.kind && x.before == y.before && x.after == y.after);

        DiffResult {
            matches: outcome.matches.into_sorted(),
            relationships,
            unmatched_before: outcome.unmatched_before,
            unmatched_after: outcome.unmatched_after,
        }
    }

    /// Canonical description of every relationship, in result order.
    pub fn descriptions(&self) -> Vec<String> {
        self.relationships.iter().map(Relationship::description).collect()
    }

    pub fn matches_of_method(&self, method: MatchMethod) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.method == method)
    }

    pub fn refactorings_of(&self, kind: RelationshipKind) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.kind == kind)
    }

    /// Counterpart of a before-node, if it was matched.
    pub fn after_of(&self, before: NodeId) -> Option<NodeId> {
        self.matches
            .binary_search_by_key(&before, |m| m.before)
            .ok()
            .map(|i| self.matches[i].after)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for DiffResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for relationship in &self.relationships {
            writeln!(f, "{relationship}")?;
        }
        Ok(())
    }
}
