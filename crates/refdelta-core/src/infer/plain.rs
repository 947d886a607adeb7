//! Rename, Move, Move-and-Rename and Change Signature

use tracing::trace;

use super::{Axis, Candidate, Entity, Evidence};
use crate::config::DetectorFamily;
use crate::model::NodeKind;
use crate::relationship::{Relationship, RelationshipKind};

/// Fallback description of every matched pair whose name, container or
/// signature changed.
pub(crate) fn detect(evidence: &Evidence<'_>) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for (b, a, m) in evidence.pairs() {
        let renamed = b.simple_name != a.simple_name && b.kind != NodeKind::Anonymous;
        let resigned = b.kind == NodeKind::Method && b.signature != a.signature;
        let pair = Entity::Before(b.id);

        let (kind, claims) = if evidence.keeps_container(b, a) {
            if renamed {
                (RelationshipKind::Rename, vec![(pair, Axis::NameChange)])
            } else if resigned {
                (RelationshipKind::ChangeSignature, vec![(pair, Axis::SignatureChange)])
            } else {
                continue;
            }
        } else if renamed {
            (
                RelationshipKind::MoveAndRename,
                vec![(pair, Axis::NameChange), (pair, Axis::ContainerChange)],
            )
        } else if resigned {
            // A move keeps the signature; moved and re-signed pairs stay
            // matched but unreported.
            trace!(before = %b.display_name(), after = %a.display_name(), "moved with new signature");
            continue;
        } else {
            (RelationshipKind::Move, vec![(pair, Axis::ContainerChange)])
        };

        trace!(?kind, before = %b.display_name(), after = %a.display_name(), "plain candidate");
        candidates.push(Candidate {
            family: DetectorFamily::Plain,
            relationship: Relationship::between(kind, b, a, m.similarity),
            claims,
        });
    }

    candidates
}
