//! Lookup indices over a tree for sub-quadratic matching

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Node, NodeId, NodeKind, Signature};
use crate::similarity::{call_target, Profiles};
use crate::tree::Tree;

/// A tree together with everything the matcher and inferencer look up in it.
#[derive(Debug, Clone)]
pub struct IndexedTree<'a> {
    pub tree: &'a Tree,
    pub index: TreeIndex,
    pub profiles: Profiles,
}

impl<'a> IndexedTree<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        IndexedTree {
            tree,
            index: TreeIndex::build(tree),
            profiles: Profiles::build(tree),
        }
    }
}

/// Key of the exact-match fast path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExactKey {
    pub kind: NodeKind,
    pub qualified_name: String,
    pub signature: Option<Signature>,
}

/// Read-only indices over one tree. A pure function of the tree.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    by_kind: BTreeMap<NodeKind, Vec<NodeId>>,
    /// Only keys held by exactly one node.
    by_exact: BTreeMap<ExactKey, NodeId>,
    /// Nodes whose exact key collides with another node of the same tree.
    ambiguous: BTreeSet<NodeId>,
    /// Children in declaration order; `None` holds the top-level nodes.
    children: BTreeMap<Option<NodeId>, Vec<NodeId>>,
    /// Simple name -> nodes whose body calls it.
    callers: BTreeMap<String, Vec<NodeId>>,
    position: Vec<usize>,
    depth: Vec<usize>,
}

impl TreeIndex {
    pub fn build(tree: &Tree) -> Self {
        let mut index = TreeIndex {
            position: vec![0; tree.len()],
            depth: vec![0; tree.len()],
            ..TreeIndex::default()
        };
        let mut exact_groups: BTreeMap<ExactKey, Vec<NodeId>> = BTreeMap::new();
        let mut positions: BTreeMap<(Option<NodeId>, Option<&str>), usize> = BTreeMap::new();

        for node in tree.nodes() {
            index.by_kind.entry(node.kind).or_default().push(node.id);

            exact_groups
                .entry(ExactKey {
                    kind: node.kind,
                    qualified_name: node.qualified_name.clone(),
                    signature: node.signature.clone(),
                })
                .or_default()
                .push(node.id);

            index.children.entry(node.container_id).or_default().push(node.id);

            // Top-level declarations count per namespace, like siblings in a container.
            let slot = (node.container_id, top_level_namespace(node));
            let next = positions.entry(slot).or_insert(0);
            index.position[node.id.index()] = *next;
            *next += 1;

            index.depth[node.id.index()] = tree.depth(node.id);

            let mut called: Vec<&str> = node
                .body_tokens
                .iter()
                .filter_map(|token| call_target(token))
                .collect();
            called.sort_unstable();
            called.dedup();
            for name in called {
                index.callers.entry(name.to_string()).or_default().push(node.id);
            }
        }

        for (key, ids) in exact_groups {
            if ids.len() == 1 {
                index.by_exact.insert(key, ids[0]);
            } else {
                tracing::trace!(
                    qualified_name = %key.qualified_name,
                    count = ids.len(),
                    "ambiguous exact key"
                );
                index.ambiguous.extend(ids);
            }
        }

        index
    }

    /// All nodes of a kind, in id order.
    pub fn of_kind(&self, kind: NodeKind) -> &[NodeId] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Kinds present in the tree, in kind order.
    pub fn kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.by_kind.keys().copied()
    }

    /// The unique node with this exact key, if there is exactly one.
    pub fn lookup_exact(&self, key: &ExactKey) -> Option<NodeId> {
        self.by_exact.get(key).copied()
    }

    /// Unambiguous exact keys, in key order.
    pub fn exact_entries(&self) -> impl Iterator<Item = (&ExactKey, NodeId)> {
        self.by_exact.iter().map(|(key, &id)| (key, id))
    }

    pub fn is_ambiguous(&self, id: NodeId) -> bool {
        self.ambiguous.contains(&id)
    }

    /// Direct children in declaration order (`None` for top-level nodes).
    pub fn children(&self, container: Option<NodeId>) -> &[NodeId] {
        self.children.get(&container).map(Vec::as_slice).unwrap_or_default()
    }

    /// Nodes whose body holds a call-reference to `simple_name`.
    pub fn callers_of(&self, simple_name: &str) -> &[NodeId] {
        self.callers.get(simple_name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether anything in the tree calls `simple_name`.
    pub fn is_called(&self, simple_name: &str) -> bool {
        !self.callers_of(simple_name).is_empty()
    }

    /// Declaration position of a node among its container's children, or
    /// among the top-level nodes of its namespace.
    pub fn position(&self, id: NodeId) -> usize {
        self.position[id.index()]
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.depth[id.index()]
    }

    pub fn max_depth(&self) -> usize {
        self.depth.iter().copied().max().unwrap_or(0)
    }
}

/// Namespace of a top-level node; empty namespaces are the default one.
fn top_level_namespace(node: &Node) -> Option<&str> {
    match node.container_id {
        Some(_) => None,
        None => node.namespace.as_deref().filter(|ns| !ns.is_empty()),
    }
}
