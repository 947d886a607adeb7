//! Extract Superclass and Extract Interface

use tracing::trace;

use super::{Axis, Candidate, Entity, Evidence};
use crate::config::DetectorFamily;
use crate::model::{Node, NodeKind};
use crate::relationship::{EntityRef, Relationship, RelationshipKind};

/// New types that existing, matched types now extend, justified by members
/// pulled up into them or, for interfaces, by members every subtype declares.
pub(crate) fn detect(evidence: &Evidence<'_>, hierarchy: &[Candidate]) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for extracted in evidence.unmatched_after() {
        let kind = match extracted.kind {
            NodeKind::Type => RelationshipKind::ExtractSuperclass,
            NodeKind::Interface => RelationshipKind::ExtractInterface,
            _ => continue,
        };

        let subtypes: Vec<&Node> = evidence
            .after
            .tree
            .subtypes(extracted.id)
            .into_iter()
            .filter(|&id| evidence.matches().contains_after(id))
            .map(|id| &evidence.after.tree[id])
            .collect();
        if subtypes.is_empty() {
            continue;
        }

        let pull_ups: Vec<f64> = hierarchy
            .iter()
            .filter(|c| {
                matches!(
                    c.relationship.kind,
                    RelationshipKind::PullUpOperation | RelationshipKind::PullUpAttribute
                ) && c
                    .relationship
                    .after
                    .iter()
                    .any(|e| evidence.after.tree[e.id].container_id == Some(extracted.id))
            })
            .map(|c| c.relationship.confidence)
            .collect();

        let confidence = if !pull_ups.is_empty() {
            pull_ups.iter().sum::<f64>() / pull_ups.len() as f64
        } else if kind == RelationshipKind::ExtractInterface && mirrored_by_all(evidence, extracted, &subtypes) {
            1.0
        } else {
            continue;
        };

        trace!(
            ?kind,
            extracted = %extracted.display_name(),
            subtypes = subtypes.len(),
            confidence,
            "supertype candidate"
        );
        candidates.push(Candidate {
            family: DetectorFamily::Supertype,
            relationship: Relationship {
                kind,
                before: subtypes
                    .iter()
                    .filter_map(|sub| evidence.matches().before_of(sub.id))
                    .map(|id| EntityRef::from(&evidence.before.tree[id]))
                    .collect(),
                after: vec![EntityRef::from(extracted)],
                confidence,
            },
            claims: vec![(Entity::After(extracted.id), Axis::Origin)],
        });
    }

    candidates
}

/// Whether the interface declares at least one member and every subtype
/// declares a member of the same kind, name and signature for each.
fn mirrored_by_all(evidence: &Evidence<'_>, interface: &Node, subtypes: &[&Node]) -> bool {
    let index = &evidence.after.index;
    let tree = evidence.after.tree;
    let members = index.children(Some(interface.id));
    !members.is_empty()
        && members.iter().all(|&member| {
            let member = &tree[member];
            subtypes.iter().all(|sub| {
                index.children(Some(sub.id)).iter().any(|&own| {
                    let own = &tree[own];
                    own.kind == member.kind
                        && own.simple_name == member.simple_name
                        && own.signature == member.signature
                })
            })
        })
}
