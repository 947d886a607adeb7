//! Node matching between a before-tree and an after-tree
//!
//! Three ordered phases, each taking the previous phase's [`MatchSet`] by
//! value and returning the extended set:
//! 1. Exact: identical (kind, qualified name, signature) keys
//! 2. Same container: weighted similarity among siblings of matched containers
//! 3. Move: the same scoring over every remaining node of a kind, with a
//!    stricter threshold
//!
//! Phase 3 runs kind by kind, types first. After each kind that produced
//! moves, a same-container sweep lets the members of moved types settle next
//! to their containers instead of being treated as independent moves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::MatchingConfig;
use crate::index::IndexedTree;
use crate::model::{Node, NodeId, NodeKind};
use crate::similarity::Scorer;

/// Which phase produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMethod {
    Exact,
    BodySimilarity,
    MoveCandidate,
}

/// A before/after correspondence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub before: NodeId,
    pub after: NodeId,
    pub similarity: f64,
    pub method: MatchMethod,
}

/// Injective partial mapping between the nodes of two trees.
///
/// Lookups are O(1) in both directions; indices are the NodeIds of the
/// respective tree.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    matches: Vec<Match>,
    before_to_after: Vec<Option<usize>>,
    after_to_before: Vec<Option<usize>>,
}

impl MatchSet {
    pub fn with_capacity(before_len: usize, after_len: usize) -> Self {
        MatchSet {
            matches: Vec::new(),
            before_to_after: vec![None; before_len],
            after_to_before: vec![None; after_len],
        }
    }

    /// Record a match. Both ends must still be free.
    fn insert(&mut self, m: Match) {
        debug_assert!(!self.contains_before(m.before), "before {} matched twice", m.before);
        debug_assert!(!self.contains_after(m.after), "after {} matched twice", m.after);
        let slot = self.matches.len();
        self.before_to_after[m.before.index()] = Some(slot);
        self.after_to_before[m.after.index()] = Some(slot);
        self.matches.push(m);
    }

    pub fn get_by_before(&self, before: NodeId) -> Option<&Match> {
        self.before_to_after
            .get(before.index())
            .copied()
            .flatten()
            .map(|slot| &self.matches[slot])
    }

    pub fn get_by_after(&self, after: NodeId) -> Option<&Match> {
        self.after_to_before
            .get(after.index())
            .copied()
            .flatten()
            .map(|slot| &self.matches[slot])
    }

    /// Counterpart of a before-node in the after-tree.
    pub fn after_of(&self, before: NodeId) -> Option<NodeId> {
        self.get_by_before(before).map(|m| m.after)
    }

    /// Counterpart of an after-node in the before-tree.
    pub fn before_of(&self, after: NodeId) -> Option<NodeId> {
        self.get_by_after(after).map(|m| m.before)
    }

    pub fn contains_before(&self, before: NodeId) -> bool {
        self.get_by_before(before).is_some()
    }

    pub fn contains_after(&self, after: NodeId) -> bool {
        self.get_by_after(after).is_some()
    }

    /// Matches in the order they were made.
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Consume the set, yielding matches sorted by before id.
    pub fn into_sorted(mut self) -> Vec<Match> {
        self.matches.sort_by_key(|m| (m.before, m.after));
        self.matches
    }
}

/// Matcher output: the match set plus both residual sets in id order.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub matches: MatchSet,
    pub unmatched_before: Vec<NodeId>,
    pub unmatched_after: Vec<NodeId>,
}

/// Where a node sits relative to the matched structure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ContainerKey {
    TopLevel(Option<String>),
    /// Container in after-tree terms.
    Nested(NodeId),
}

/// A scored pair waiting for greedy assignment.
#[derive(Debug)]
struct Candidate<'t> {
    before: &'t Node,
    after: &'t Node,
    similarity: f64,
    order_distance: usize,
    before_name: String,
    after_name: String,
}

/// Multi-phase node matcher. Holds only configuration; reentrant.
#[derive(Debug, Clone)]
pub struct NodeMatcher {
    config: MatchingConfig,
}

impl NodeMatcher {
    pub fn new(config: &MatchingConfig) -> Self {
        NodeMatcher {
            config: config.clone(),
        }
    }

    pub fn run(&self, before: &IndexedTree<'_>, after: &IndexedTree<'_>) -> MatchOutcome {
        let scorer = Scorer::new(&self.config.weights, &before.profiles, &after.profiles);

        let matches = self.exact_phase(before, after);
        let exact = matches.len();

        let mut matches = self.same_container_phase(before, after, &scorer, matches);
        let similar = matches.len() - exact;

        let mut moved = 0;
        let mut settled = 0;
        let kinds: Vec<NodeKind> = before.index.kinds().collect();
        for kind in kinds {
            let start = matches.len();
            matches = self.move_phase(before, after, &scorer, matches, kind);
            let after_move = matches.len();
            moved += after_move - start;
            if after_move > start {
                matches = self.same_container_phase(before, after, &scorer, matches);
                settled += matches.len() - after_move;
            }
        }

        debug!(
            exact,
            similar,
            moved,
            settled,
            before_nodes = before.tree.len(),
            after_nodes = after.tree.len(),
            "Node matching complete"
        );

        let unmatched_before = before
            .tree
            .nodes()
            .map(|n| n.id)
            .filter(|&id| !matches.contains_before(id))
            .collect();
        let unmatched_after = after
            .tree
            .nodes()
            .map(|n| n.id)
            .filter(|&id| !matches.contains_after(id))
            .collect();

        MatchOutcome {
            matches,
            unmatched_before,
            unmatched_after,
        }
    }

    /// Phase 1: keys that are unique in both trees.
    fn exact_phase(&self, before: &IndexedTree<'_>, after: &IndexedTree<'_>) -> MatchSet {
        let mut matches = MatchSet::with_capacity(before.tree.len(), after.tree.len());
        for (key, b) in before.index.exact_entries() {
            if let Some(a) = after.index.lookup_exact(key) {
                matches.insert(Match {
                    before: b,
                    after: a,
                    similarity: 1.0,
                    method: MatchMethod::Exact,
                });
            }
        }
        matches
    }

    /// Phase 2, one containment level at a time so that containers matched
    /// at depth d group their children at depth d + 1.
    fn same_container_phase(
        &self,
        before: &IndexedTree<'_>,
        after: &IndexedTree<'_>,
        scorer: &Scorer<'_>,
        mut matches: MatchSet,
    ) -> MatchSet {
        for depth in 0..=before.index.max_depth() {
            let mut groups: BTreeMap<(ContainerKey, NodeKind), Vec<&Node>> = BTreeMap::new();
            for a in after.tree.nodes().filter(|a| !matches.contains_after(a.id)) {
                let key = match a.container_id {
                    Some(container) => ContainerKey::Nested(container),
                    None => ContainerKey::TopLevel(namespace_of(a)),
                };
                groups.entry((key, a.kind)).or_default().push(a);
            }

            let mut candidates = Vec::new();
            for b in before.tree.nodes() {
                if before.index.depth(b.id) != depth || matches.contains_before(b.id) {
                    continue;
                }
                let key = match b.container_id {
                    Some(container) => match matches.after_of(container) {
                        Some(counterpart) => ContainerKey::Nested(counterpart),
                        None => continue,
                    },
                    None => ContainerKey::TopLevel(namespace_of(b)),
                };
                let Some(siblings) = groups.get(&(key, b.kind)) else {
                    continue;
                };
                for &a in siblings {
                    self.push_candidate(
                        &mut candidates,
                        before,
                        after,
                        scorer,
                        b,
                        a,
                        self.config.same_container_threshold,
                    );
                }
            }

            if !candidates.is_empty() {
                trace!(depth, candidates = candidates.len(), "same-container candidates");
            }
            matches = assign_greedily(matches, candidates, MatchMethod::BodySimilarity);
        }
        matches
    }

    /// Phase 3 for one kind: every remaining pair regardless of container.
    fn move_phase(
        &self,
        before: &IndexedTree<'_>,
        after: &IndexedTree<'_>,
        scorer: &Scorer<'_>,
        matches: MatchSet,
        kind: NodeKind,
    ) -> MatchSet {
        let residual_after: Vec<&Node> = after
            .index
            .of_kind(kind)
            .iter()
            .filter(|&&id| !matches.contains_after(id))
            .map(|&id| &after.tree[id])
            .collect();
        if residual_after.is_empty() {
            return matches;
        }

        let mut candidates = Vec::new();
        for &id in before.index.of_kind(kind) {
            if matches.contains_before(id) {
                continue;
            }
            let b = &before.tree[id];
            for &a in &residual_after {
                self.push_candidate(
                    &mut candidates,
                    before,
                    after,
                    scorer,
                    b,
                    a,
                    self.config.move_threshold,
                );
            }
        }

        trace!(?kind, candidates = candidates.len(), "move candidates");
        assign_greedily(matches, candidates, MatchMethod::MoveCandidate)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_candidate<'t>(
        &self,
        candidates: &mut Vec<Candidate<'t>>,
        before: &IndexedTree<'_>,
        after: &IndexedTree<'_>,
        scorer: &Scorer<'_>,
        b: &'t Node,
        a: &'t Node,
        threshold: f64,
    ) {
        let similarity = scorer.score(b, a);
        if similarity < threshold {
            return;
        }
        candidates.push(Candidate {
            before: b,
            after: a,
            similarity,
            order_distance: before.index.position(b.id).abs_diff(after.index.position(a.id)),
            before_name: b.display_name(),
            after_name: a.display_name(),
        });
    }
}

/// Greedy assignment in tie-break order, skipping pairs with a matched end.
fn assign_greedily(mut matches: MatchSet, mut candidates: Vec<Candidate<'_>>, method: MatchMethod) -> MatchSet {
    candidates.sort_by(|x, y| {
        y.similarity
            .total_cmp(&x.similarity)
            .then(x.order_distance.cmp(&y.order_distance))
            .then_with(|| x.before_name.cmp(&y.before_name))
            .then_with(|| x.after_name.cmp(&y.after_name))
            .then(x.before.id.cmp(&y.before.id))
            .then(x.after.id.cmp(&y.after.id))
    });

    for candidate in candidates {
        if matches.contains_before(candidate.before.id) || matches.contains_after(candidate.after.id) {
            continue;
        }
        trace!(
            before = %candidate.before_name,
            after = %candidate.after_name,
            similarity = candidate.similarity,
            ?method,
            "matched"
        );
        matches.insert(Match {
            before: candidate.before.id,
            after: candidate.after.id,
            similarity: candidate.similarity,
            method,
        });
    }
    matches
}

/// Empty namespaces are the default namespace.
fn namespace_of(node: &Node) -> Option<String> {
    node.namespace.clone().filter(|ns| !ns.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeSpec, TreeBuilder};

    fn run(before: &crate::tree::Tree, after: &crate::tree::Tree) -> MatchOutcome {
        let matcher = NodeMatcher::new(&MatchingConfig::default());
        matcher.run(&IndexedTree::new(before), &IndexedTree::new(after))
    }

    #[test]
    fn test_empty_trees_match_nothing() {
        let empty = TreeBuilder::new().build().unwrap();
        let outcome = run(&empty, &empty);
        assert!(outcome.matches.is_empty());
        assert!(outcome.unmatched_before.is_empty());
        assert!(outcome.unmatched_after.is_empty());
    }

    #[test]
    fn test_exact_phase_anchors_children() {
        let mut before = TreeBuilder::new();
        let t = before.add(NodeSpec::type_decl("T"));
        let foo = before.add(NodeSpec::method("foo", ["int"]).within(t).with_body(["return", "x", "+", "1"]));
        let before = before.build().unwrap();

        let mut after = TreeBuilder::new();
        let t2 = after.add(NodeSpec::type_decl("T"));
        let bar = after.add(NodeSpec::method("bar", ["int"]).within(t2).with_body(["return", "x", "+", "1"]));
        let after = after.build().unwrap();

        let outcome = run(&before, &after);
        assert_eq!(outcome.matches.get_by_before(t).unwrap().method, MatchMethod::Exact);
        let m = outcome.matches.get_by_before(foo).unwrap();
        assert_eq!(m.after, bar);
        assert_eq!(m.method, MatchMethod::BodySimilarity);
        assert!(m.similarity >= 0.5 && m.similarity < 1.0);
    }

    #[test]
    fn test_duplicate_keys_resolved_by_position() {
        let build = || {
            let mut builder = TreeBuilder::new();
            builder.add(NodeSpec::type_decl("Dup").with_body(["a"]));
            builder.add(NodeSpec::type_decl("Dup").with_body(["a"]));
            builder.build().unwrap()
        };
        let tree = build();
        let outcome = run(&tree, &build());
        assert_eq!(outcome.matches.after_of(NodeId(0)), Some(NodeId(0)));
        assert_eq!(outcome.matches.after_of(NodeId(1)), Some(NodeId(1)));
        assert!(outcome.matches.iter().all(|m| m.method == MatchMethod::BodySimilarity));
    }

    #[test]
    fn test_move_requires_higher_threshold() {
        let mut before = TreeBuilder::new();
        let a = before.add(NodeSpec::type_decl("A"));
        before.add(NodeSpec::type_decl("B"));
        let m = before.add(NodeSpec::method("work", ["int"]).within(a).with_body(["x", "y", "z", "w"]));
        let before = before.build().unwrap();

        let mut after = TreeBuilder::new();
        after.add(NodeSpec::type_decl("A"));
        let b = after.add(NodeSpec::type_decl("B"));
        let moved = after.add(NodeSpec::method("work", ["int"]).within(b).with_body(["x", "y", "z", "w"]));
        let after = after.build().unwrap();

        let outcome = run(&before, &after);
        let found = outcome.matches.get_by_before(m).unwrap();
        assert_eq!(found.after, moved);
        assert_eq!(found.method, MatchMethod::MoveCandidate);

        let mut config = MatchingConfig::default();
        config.same_container_threshold = 1.0;
        config.move_threshold = 1.0;
        let mut after2 = TreeBuilder::new();
        after2.add(NodeSpec::type_decl("A"));
        let b2 = after2.add(NodeSpec::type_decl("B"));
        after2.add(NodeSpec::method("work", ["int"]).within(b2).with_body(["x", "y", "q", "w"]));
        let after2 = after2.build().unwrap();
        let outcome = NodeMatcher::new(&config).run(&IndexedTree::new(&before), &IndexedTree::new(&after2));
        assert!(outcome.unmatched_before.contains(&m));
    }

    #[test]
    fn test_members_of_moved_type_settle() {
        let mut before = TreeBuilder::new();
        let t = before.add(NodeSpec::type_decl("Widget").in_namespace("ui").with_body(["w", "x", "y", "z"]));
        let f = before.add(NodeSpec::field("size").within(t));
        let before = before.build().unwrap();

        let mut after = TreeBuilder::new();
        let t2 = after.add(NodeSpec::type_decl("Widget").in_namespace("core").with_body(["w", "x", "y", "z"]));
        let f2 = after.add(NodeSpec::field("size").within(t2));
        let after = after.build().unwrap();

        let outcome = run(&before, &after);
        assert_eq!(outcome.matches.get_by_before(t).unwrap().method, MatchMethod::MoveCandidate);
        let member = outcome.matches.get_by_before(f).unwrap();
        assert_eq!(member.after, f2);
        assert_eq!(member.method, MatchMethod::BodySimilarity);
    }
}
