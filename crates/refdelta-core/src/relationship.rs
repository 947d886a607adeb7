//! Typed refactoring relationships

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Node, NodeId, NodeKind};

/// Refactoring kinds. Declaration order is the primary sort key of a
/// [`crate::DiffResult`]'s relationship list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Rename,
    Move,
    MoveAndRename,
    ChangeSignature,
    ExtractOperation,
    ExtractAndMoveOperation,
    InlineOperation,
    PullUpOperation,
    PushDownOperation,
    PullUpAttribute,
    PushDownAttribute,
    ExtractSuperclass,
    ExtractInterface,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 13] = [
        RelationshipKind::Rename,
        RelationshipKind::Move,
        RelationshipKind::MoveAndRename,
        RelationshipKind::ChangeSignature,
        RelationshipKind::ExtractOperation,
        RelationshipKind::ExtractAndMoveOperation,
        RelationshipKind::InlineOperation,
        RelationshipKind::PullUpOperation,
        RelationshipKind::PushDownOperation,
        RelationshipKind::PullUpAttribute,
        RelationshipKind::PushDownAttribute,
        RelationshipKind::ExtractSuperclass,
        RelationshipKind::ExtractInterface,
    ];

    /// Stable name used in descriptions.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipKind::Rename => "Rename",
            RelationshipKind::Move => "Move",
            RelationshipKind::MoveAndRename => "MoveAndRename",
            RelationshipKind::ChangeSignature => "ChangeSignature",
            RelationshipKind::ExtractOperation => "ExtractOperation",
            RelationshipKind::ExtractAndMoveOperation => "ExtractAndMoveOperation",
            RelationshipKind::InlineOperation => "InlineOperation",
            RelationshipKind::PullUpOperation => "PullUpOperation",
            RelationshipKind::PushDownOperation => "PushDownOperation",
            RelationshipKind::PullUpAttribute => "PullUpAttribute",
            RelationshipKind::PushDownAttribute => "PushDownAttribute",
            RelationshipKind::ExtractSuperclass => "ExtractSuperclass",
            RelationshipKind::ExtractInterface => "ExtractInterface",
        }
    }

    pub fn pull_up(member: NodeKind) -> Self {
        match member {
            NodeKind::Field => RelationshipKind::PullUpAttribute,
            _ => RelationshipKind::PullUpOperation,
        }
    }

    pub fn push_down(member: NodeKind) -> Self {
        match member {
            NodeKind::Field => RelationshipKind::PushDownAttribute,
            _ => RelationshipKind::PushDownOperation,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a relationship: a node of the before- or after-tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Rendered name, see [`Node::display_name`].
    pub name: String,
}

impl From<&Node> for EntityRef {
    fn from(node: &Node) -> Self {
        EntityRef {
            id: node.id,
            kind: node.kind,
            name: node.display_name(),
        }
    }
}

/// An inferred refactoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub before: Vec<EntityRef>,
    pub after: Vec<EntityRef>,
    pub confidence: f64,
}

impl Relationship {
    /// A 1:1 relationship.
    pub fn between(kind: RelationshipKind, before: &Node, after: &Node, confidence: f64) -> Self {
        Relationship {
            kind,
            before: vec![before.into()],
            after: vec![after.into()],
            confidence,
        }
    }

    /// Canonical `"<Kind> <before> <after>"` form. Several entities on one
    /// side are joined with commas in name order.
    pub fn description(&self) -> String {
        format!(
            "{} {} {}",
            self.kind,
            join_names(&self.before),
            join_names(&self.after)
        )
    }

    /// Key used to order relationships within a result.
    pub(crate) fn sort_key(&self) -> (RelationshipKind, String, String) {
        (self.kind, join_names(&self.before), join_names(&self.after))
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

fn join_names(entities: &[EntityRef]) -> String {
    let mut names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    names.sort_unstable();
    names.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32, name: &str) -> EntityRef {
        EntityRef {
            id: NodeId(id),
            kind: NodeKind::Type,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_description_joins_sorted_names() {
        let relationship = Relationship {
            kind: RelationshipKind::ExtractSuperclass,
            before: vec![entity(2, "Square"), entity(1, "Circle")],
            after: vec![entity(5, "Shape")],
            confidence: 1.0,
        };
        assert_eq!(relationship.description(), "ExtractSuperclass Circle,Square Shape");
        assert_eq!(relationship.to_string(), relationship.description());
    }

    #[test]
    fn test_member_kind_selects_variant() {
        assert_eq!(RelationshipKind::pull_up(NodeKind::Field), RelationshipKind::PullUpAttribute);
        assert_eq!(RelationshipKind::pull_up(NodeKind::Method), RelationshipKind::PullUpOperation);
        assert_eq!(RelationshipKind::push_down(NodeKind::Field), RelationshipKind::PushDownAttribute);
        assert_eq!(RelationshipKind::push_down(NodeKind::Method), RelationshipKind::PushDownOperation);
    }

    #[test]
    fn test_kind_names_are_stable() {
        for kind in RelationshipKind::ALL {
            assert_eq!(format!("{kind:?}"), kind.as_str());
        }
    }
}
