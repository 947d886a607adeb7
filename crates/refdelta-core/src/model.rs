//! Core data structures for one structural snapshot

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Dense index of a node inside its own tree. Not comparable across trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminates what kind of declaration a node represents.
///
/// Declaration order is significant: Phase 3 of the matcher and the
/// relationship ordering both iterate kinds in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    // ── Types ───────────────────────────────────────────────
    Type,
    Interface,
    /// Synthetic unit for anonymous or local types.
    Anonymous,

    // ── Members ─────────────────────────────────────────────
    Method,
    Field,
}

impl NodeKind {
    /// Whether nodes of this kind can take part in inheritance edges.
    pub fn is_type(self) -> bool {
        matches!(self, NodeKind::Type | NodeKind::Interface | NodeKind::Anonymous)
    }

    /// Whether nodes of this kind are members that can move along a hierarchy.
    pub fn is_member(self) -> bool {
        matches!(self, NodeKind::Method | NodeKind::Field)
    }
}

/// Ordered list of parameter type descriptors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Signature(pub Vec<String>);

impl Signature {
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Signature(params.into_iter().map(Into::into).collect())
    }

    pub fn params(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Where a declaration lives in source. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Location {
    pub file_path: PathBuf,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    pub byte_start: Option<u32>,
    pub byte_end: Option<u32>,
}

impl Location {
    pub fn in_file(file_path: impl Into<PathBuf>) -> Self {
        Location {
            file_path: file_path.into(),
            ..Location::default()
        }
    }
}

/// One declaration in a structural tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub simple_name: String,
    pub qualified_name: String,
    /// Package or module path of a top-level declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Parameter types; present for methods only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<NodeId>,
    #[serde(default)]
    pub body_tokens: Vec<String>,
    #[serde(default)]
    pub supertype_ids: Vec<NodeId>,
    #[serde(default)]
    pub subtype_ids: Vec<NodeId>,
    #[serde(default)]
    pub location: Location,
}

impl Node {
    /// Name used when rendering relationships: the qualified name, followed
    /// by the parameter list for methods.
    pub fn display_name(&self) -> String {
        match &self.signature {
            Some(signature) if self.kind == NodeKind::Method => {
                format!("{}{}", self.qualified_name, signature)
            }
            _ => self.qualified_name.clone(),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.container_id.is_none()
    }
}

/// Structural edges stored alongside the nodes of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeEdge {
    /// Container to contained declaration.
    Contains,
    /// Subtype to one of its declared supertypes.
    Inherits,
}
