//! Relationship inference over a match outcome
//!
//! Each detector family is a pure function from the same immutable
//! [`Evidence`] to a list of [`Candidate`]s. The reducer then walks the
//! families in the configured priority order. A candidate is accepted unless
//! one of its claims is already held by a different family.

mod extract;
mod hierarchy;
mod plain;
mod supertype;

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::{DetectorFamily, InferenceConfig};
use crate::index::IndexedTree;
use crate::matcher::{Match, MatchOutcome, MatchSet};
use crate::model::{Node, NodeId};
use crate::relationship::Relationship;

/// Axis of change a candidate asserts about an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Axis {
    NameChange,
    ContainerChange,
    SignatureChange,
    /// Where a residual node came from or went to.
    Origin,
}

/// Entity a claim is made on. Matched pairs are identified by their
/// before-node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Entity {
    Before(NodeId),
    After(NodeId),
}

pub(crate) type Claim = (Entity, Axis);

/// A relationship proposed by a detector, not yet accepted.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub family: DetectorFamily,
    pub relationship: Relationship,
    pub claims: Vec<Claim>,
}

/// Everything detectors may look at.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Evidence<'e> {
    pub before: &'e IndexedTree<'e>,
    pub after: &'e IndexedTree<'e>,
    pub outcome: &'e MatchOutcome,
}

impl<'e> Evidence<'e> {
    pub fn matches(&self) -> &'e MatchSet {
        let outcome = self.outcome;
        &outcome.matches
    }

    /// Matched pairs in match order.
    pub fn pairs(&self) -> impl Iterator<Item = (&'e Node, &'e Node, &'e Match)> + 'e {
        let before = self.before.tree;
        let after = self.after.tree;
        let outcome = self.outcome;
        outcome
            .matches
            .iter()
            .map(move |m| (&before[m.before], &after[m.after], m))
    }

    pub fn unmatched_before(&self) -> impl Iterator<Item = &'e Node> + 'e {
        let before = self.before.tree;
        let outcome = self.outcome;
        outcome.unmatched_before.iter().map(move |&id| &before[id])
    }

    pub fn unmatched_after(&self) -> impl Iterator<Item = &'e Node> + 'e {
        let after = self.after.tree;
        let outcome = self.outcome;
        outcome.unmatched_after.iter().map(move |&id| &after[id])
    }

    /// Whether a matched pair stayed in corresponding containers: both nested
    /// with matched containers, or both top-level in the same namespace.
    pub fn keeps_container(&self, b: &Node, a: &Node) -> bool {
        match (b.container_id, a.container_id) {
            (Some(bc), Some(ac)) => self.matches().after_of(bc) == Some(ac),
            (None, None) => namespace(b) == namespace(a),
            _ => false,
        }
    }

    /// Whether `to` (after-tree) is a transitive supertype of `from`
    /// (before-tree), as recorded in either tree.
    pub fn is_pull_up(&self, from: NodeId, to: NodeId) -> bool {
        let in_after = self
            .matches()
            .after_of(from)
            .is_some_and(|from_after| self.after.tree.is_supertype_of(to, from_after));
        let in_before = self
            .matches()
            .before_of(to)
            .is_some_and(|to_before| self.before.tree.is_supertype_of(to_before, from));
        in_after || in_before
    }

    /// Whether `to` (after-tree) is a transitive subtype of `from`
    /// (before-tree), as recorded in either tree.
    pub fn is_push_down(&self, from: NodeId, to: NodeId) -> bool {
        let in_after = self
            .matches()
            .after_of(from)
            .is_some_and(|from_after| self.after.tree.is_supertype_of(from_after, to));
        let in_before = self
            .matches()
            .before_of(to)
            .is_some_and(|to_before| self.before.tree.is_supertype_of(from, to_before));
        in_after || in_before
    }
}

fn namespace(node: &Node) -> Option<&str> {
    node.namespace.as_deref().filter(|ns| !ns.is_empty())
}

/// Runs every detector family and reduces their candidates.
#[derive(Debug, Clone)]
pub struct Inferencer {
    config: InferenceConfig,
}

impl Inferencer {
    pub fn new(config: &InferenceConfig) -> Self {
        Inferencer {
            config: config.clone(),
        }
    }

    /// Accepted relationships, unsorted.
    pub fn run(
        &self,
        before: &IndexedTree<'_>,
        after: &IndexedTree<'_>,
        outcome: &MatchOutcome,
    ) -> Vec<Relationship> {
        let evidence = Evidence {
            before,
            after,
            outcome,
        };

        let hierarchy = hierarchy::detect(&evidence, &self.config);
        let mut candidates = extract::detect(&evidence, &self.config);
        candidates.extend(supertype::detect(&evidence, &hierarchy));
        candidates.extend(hierarchy);
        candidates.extend(plain::detect(&evidence));

        reduce(candidates, &self.config.priority)
    }
}

/// Accept candidates family by family in priority order.
///
/// Members of one family never block each other, so the order of candidates
/// within a family does not affect the outcome.
pub(crate) fn reduce(candidates: Vec<Candidate>, priority: &[DetectorFamily]) -> Vec<Relationship> {
    let mut by_family: BTreeMap<DetectorFamily, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        by_family.entry(candidate.family).or_default().push(candidate);
    }

    let mut held: BTreeMap<Claim, DetectorFamily> = BTreeMap::new();
    let mut accepted = Vec::new();
    let mut rejected = 0usize;

    for &family in priority {
        let Some(candidates) = by_family.remove(&family) else {
            continue;
        };
        for candidate in candidates {
            let conflict = candidate
                .claims
                .iter()
                .find_map(|claim| held.get(claim).copied().filter(|&holder| holder != family));
            if let Some(holder) = conflict {
                trace!(
                    relationship = %candidate.relationship,
                    ?family,
                    ?holder,
                    "candidate rejected"
                );
                rejected += 1;
                continue;
            }
            for claim in candidate.claims {
                held.insert(claim, family);
            }
            accepted.push(candidate.relationship);
        }
    }

    debug!(accepted = accepted.len(), rejected, "Relationship inference complete");
    accepted
}
