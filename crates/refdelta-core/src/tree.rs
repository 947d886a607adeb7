//! Structural tree wrapper using petgraph::StableDiGraph indexed by NodeId

use std::collections::HashSet;
use std::ops::Index;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::model::*;

/// One codebase snapshot: a forest of declarations plus inheritance edges.
///
/// A `Tree` can only be obtained through [`Tree::from_nodes`], the
/// [`TreeBuilder`] or deserialization, all of which validate the forest and
/// id invariants. Every `Tree` value is therefore well-formed.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "TreeFile", into = "TreeFile")]
pub struct Tree {
    inner: StableDiGraph<Node, TreeEdge>,
}

/// On-disk shape of a tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TreeFile {
    pub nodes: Vec<Node>,
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Tree {
    /// An empty snapshot.
    pub fn empty() -> Self {
        Tree {
            inner: StableDiGraph::new(),
        }
    }

    /// Validate `nodes` and build a tree from them.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, InvariantViolation> {
        check_invariants(&nodes)?;

        let mut inner = StableDiGraph::with_capacity(nodes.len(), nodes.len());
        let mut contains = Vec::new();
        let mut inherits = Vec::new();
        for node in nodes {
            if let Some(container) = node.container_id {
                contains.push((container, node.id));
            }
            for &sup in &node.supertype_ids {
                inherits.push((node.id, sup));
            }
            inner.add_node(node);
        }
        for (container, child) in contains {
            inner.add_edge(index_of(container), index_of(child), TreeEdge::Contains);
        }
        for (sub, sup) in inherits {
            inner.add_edge(index_of(sub), index_of(sup), TreeEdge::Inherits);
        }

        Ok(Tree { inner })
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.inner.node_weight(index_of(id))
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Iterate over all nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Declared direct supertypes of a type, in id order.
    pub fn supertypes(&self, id: NodeId) -> Vec<NodeId> {
        self.inheritance(id, Direction::Outgoing)
    }

    /// Declared direct subtypes of a type, in id order.
    pub fn subtypes(&self, id: NodeId) -> Vec<NodeId> {
        self.inheritance(id, Direction::Incoming)
    }

    fn inheritance(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .inner
            .edges_directed(index_of(id), direction)
            .filter(|edge| *edge.weight() == TreeEdge::Inherits)
            .map(|edge| match direction {
                Direction::Outgoing => id_of(edge.target()),
                Direction::Incoming => id_of(edge.source()),
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// All transitive supertypes of a type. Tolerates inheritance cycles.
    pub fn ancestor_types(&self, id: NodeId) -> HashSet<NodeId> {
        let mut ancestors = HashSet::new();
        let mut to_visit = vec![id];

        while let Some(current) = to_visit.pop() {
            for sup in self.supertypes(current) {
                if sup != id && ancestors.insert(sup) {
                    to_visit.push(sup);
                }
            }
        }

        ancestors
    }

    /// Whether `sup` is a direct or transitive supertype of `sub`.
    pub fn is_supertype_of(&self, sup: NodeId, sub: NodeId) -> bool {
        sup != sub && self.ancestor_types(sub).contains(&sup)
    }

    /// Number of containers above a node (0 for top-level declarations),
    /// counted along the `Contains` edges.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = index_of(id);
        while let Some(edge) = self
            .inner
            .edges_directed(current, Direction::Incoming)
            .find(|edge| *edge.weight() == TreeEdge::Contains)
        {
            depth += 1;
            current = edge.source();
        }
        depth
    }

    /// Snapshot of the nodes in their serializable form.
    pub fn to_file(&self) -> TreeFile {
        TreeFile {
            nodes: self.nodes().cloned().collect(),
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::empty()
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.inner[index_of(id)]
    }
}

impl TryFrom<TreeFile> for Tree {
    type Error = InvariantViolation;

    fn try_from(file: TreeFile) -> Result<Self, Self::Error> {
        Tree::from_nodes(file.nodes)
    }
}

impl From<Tree> for TreeFile {
    fn from(tree: Tree) -> Self {
        tree.to_file()
    }
}

fn index_of(id: NodeId) -> NodeIndex {
    NodeIndex::new(id.index())
}

fn id_of(idx: NodeIndex) -> NodeId {
    NodeId::from(idx.index())
}

fn check_invariants(nodes: &[Node]) -> Result<(), InvariantViolation> {
    let len = nodes.len();
    let exists = |id: NodeId| id.index() < len;

    for (position, node) in nodes.iter().enumerate() {
        if node.id.index() != position {
            return Err(InvariantViolation::NonDenseId {
                position,
                found: node.id,
            });
        }
        if let Some(container) = node.container_id {
            if container == node.id {
                return Err(InvariantViolation::SelfContainment { node: node.id });
            }
            if !exists(container) {
                return Err(InvariantViolation::DanglingContainer {
                    node: node.id,
                    container,
                });
            }
        }
    }

    let containment: DiGraph<(), ()> = DiGraph::from_edges(
        nodes
            .iter()
            .filter_map(|n| n.container_id.map(|c| (c.0, n.id.0))),
    );
    if let Err(cycle) = toposort(&containment, None) {
        return Err(InvariantViolation::ContainmentCycle {
            node: NodeId::from(cycle.node_id().index()),
        });
    }

    for node in nodes {
        for &sup in &node.supertype_ids {
            if !exists(sup) {
                return Err(InvariantViolation::DanglingSupertype {
                    node: node.id,
                    supertype: sup,
                });
            }
            let sup_node = &nodes[sup.index()];
            if !node.kind.is_type() || !sup_node.kind.is_type() {
                return Err(InvariantViolation::SupertypeNotAType {
                    node: node.id,
                    supertype: sup,
                });
            }
            if !sup_node.subtype_ids.contains(&node.id) {
                return Err(InvariantViolation::AsymmetricInheritance {
                    sub: node.id,
                    sup,
                });
            }
        }
        for &sub in &node.subtype_ids {
            if !exists(sub) {
                return Err(InvariantViolation::DanglingSupertype {
                    node: sub,
                    supertype: node.id,
                });
            }
            if !nodes[sub.index()].supertype_ids.contains(&node.id) {
                return Err(InvariantViolation::AsymmetricInheritance { sub, sup: node.id });
            }
        }
    }

    Ok(())
}

/// Declaration handed to a [`TreeBuilder`].
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub simple_name: String,
    pub namespace: Option<String>,
    pub container: Option<NodeId>,
    pub signature: Option<Signature>,
    pub body_tokens: Vec<String>,
    pub location: Location,
}

impl NodeSpec {
    pub fn new(kind: NodeKind, simple_name: impl Into<String>) -> Self {
        NodeSpec {
            kind,
            simple_name: simple_name.into(),
            namespace: None,
            container: None,
            signature: None,
            body_tokens: Vec::new(),
            location: Location::default(),
        }
    }

    pub fn type_decl(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Type, name)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Interface, name)
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Field, name)
    }

    pub fn method<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::new(NodeKind::Method, name);
        spec.signature = Some(Signature::new(params));
        spec
    }

    pub fn within(mut self, container: NodeId) -> Self {
        self.container = Some(container);
        self
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_body<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

/// Incrementally assembles a [`Tree`], assigning dense ids and qualified names.
///
/// Containers must be added before their members.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    specs: Vec<NodeSpec>,
    inheritance: Vec<(NodeId, NodeId)>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Returns its assigned NodeId.
    pub fn add(&mut self, spec: NodeSpec) -> NodeId {
        let id = NodeId::from(self.specs.len());
        self.specs.push(spec);
        id
    }

    /// Record that `sub` declares `sup` as a supertype.
    pub fn add_supertype(&mut self, sub: NodeId, sup: NodeId) -> &mut Self {
        self.inheritance.push((sub, sup));
        self
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.specs.get(id.index()).map(|spec| spec.kind)
    }

    /// Qualified name the node will receive, if its container chain is valid.
    pub fn qualified_name(&self, id: NodeId) -> Option<String> {
        let spec = self.specs.get(id.index())?;
        match spec.container {
            Some(container) if container < id => {
                Some(format!("{}.{}", self.qualified_name(container)?, spec.simple_name))
            }
            Some(_) => None,
            None => Some(top_level_name(spec)),
        }
    }

    pub fn build(self) -> Result<Tree, InvariantViolation> {
        let mut nodes: Vec<Node> = Vec::with_capacity(self.specs.len());

        for (position, spec) in self.specs.into_iter().enumerate() {
            let id = NodeId::from(position);
            let qualified_name = match spec.container {
                Some(container) if container == id => {
                    return Err(InvariantViolation::SelfContainment { node: id });
                }
                Some(container) => match nodes.get(container.index()) {
                    Some(parent) => format!("{}.{}", parent.qualified_name, spec.simple_name),
                    None => {
                        return Err(InvariantViolation::DanglingContainer {
                            node: id,
                            container,
                        });
                    }
                },
                None => top_level_name(&spec),
            };

            nodes.push(Node {
                id,
                kind: spec.kind,
                simple_name: spec.simple_name,
                qualified_name,
                namespace: spec.namespace,
                signature: spec.signature,
                container_id: spec.container,
                body_tokens: spec.body_tokens,
                supertype_ids: Vec::new(),
                subtype_ids: Vec::new(),
                location: spec.location,
            });
        }

        for (sub, sup) in self.inheritance {
            if sub.index() >= nodes.len() {
                return Err(InvariantViolation::DanglingSupertype {
                    node: sub,
                    supertype: sup,
                });
            }
            if sup.index() >= nodes.len() {
                return Err(InvariantViolation::DanglingSupertype {
                    node: sub,
                    supertype: sup,
                });
            }
            if !nodes[sub.index()].supertype_ids.contains(&sup) {
                nodes[sub.index()].supertype_ids.push(sup);
                nodes[sup.index()].subtype_ids.push(sub);
            }
        }

        Tree::from_nodes(nodes)
    }
}

fn top_level_name(spec: &NodeSpec) -> String {
    match &spec.namespace {
        Some(namespace) if !namespace.is_empty() => format!("{}.{}", namespace, spec.simple_name),
        _ => spec.simple_name.clone(),
    }
}
