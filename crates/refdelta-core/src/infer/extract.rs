//! Extract, Extract-and-Move and Inline operations
//!
//! Extraction leaves a directional trace: tokens disappear from a caller's
//! body and reappear in a new method the caller now calls. Inlining is the
//! mirror image, with the call gone from the whole after-tree.

use tracing::trace;

use super::{Axis, Candidate, Entity, Evidence};
use crate::config::{DetectorFamily, InferenceConfig};
use crate::model::NodeKind;
use crate::relationship::{EntityRef, Relationship, RelationshipKind};
use crate::similarity::containment;

pub(crate) fn detect(evidence: &Evidence<'_>, config: &InferenceConfig) -> Vec<Candidate> {
    let mut candidates = extractions(evidence, config);
    candidates.extend(inlines(evidence, config));
    candidates
}

fn extractions(evidence: &Evidence<'_>, config: &InferenceConfig) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for extracted in evidence.unmatched_after() {
        if extracted.kind != NodeKind::Method {
            continue;
        }
        let name = extracted.simple_name.as_str();
        let extracted_body = evidence.after.profiles.body(extracted.id);

        for &caller_after in evidence.after.index.callers_of(name) {
            if caller_after == extracted.id {
                continue;
            }
            let Some(caller_before) = evidence.matches().before_of(caller_after) else {
                continue;
            };
            let before_body = evidence.before.profiles.body(caller_before);
            let after_body = evidence.after.profiles.body(caller_after);
            if after_body.calls_to(name) <= before_body.calls_to(name) {
                continue;
            }

            let removed = before_body.minus(after_body);
            let overlap = containment(extracted_body, &removed);
            trace!(
                extracted = %extracted.display_name(),
                caller = %evidence.after.tree[caller_after].display_name(),
                overlap,
                "extract overlap"
            );
            if overlap < config.extract_min_overlap {
                continue;
            }

            let kind = if evidence.after.tree[caller_after].container_id == extracted.container_id {
                RelationshipKind::ExtractOperation
            } else {
                RelationshipKind::ExtractAndMoveOperation
            };
            candidates.push(Candidate {
                family: DetectorFamily::ExtractInline,
                relationship: Relationship {
                    kind,
                    before: vec![EntityRef::from(&evidence.before.tree[caller_before])],
                    after: vec![EntityRef::from(extracted)],
                    confidence: overlap,
                },
                claims: vec![(Entity::After(extracted.id), Axis::Origin)],
            });
        }
    }

    candidates
}

fn inlines(evidence: &Evidence<'_>, config: &InferenceConfig) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for inlined in evidence.unmatched_before() {
        if inlined.kind != NodeKind::Method {
            continue;
        }
        let name = inlined.simple_name.as_str();
        if evidence.after.index.is_called(name) {
            continue;
        }
        let inlined_body = evidence.before.profiles.body(inlined.id);

        for &caller_before in evidence.before.index.callers_of(name) {
            if caller_before == inlined.id {
                continue;
            }
            let Some(caller_after) = evidence.matches().after_of(caller_before) else {
                continue;
            };
            let before_body = evidence.before.profiles.body(caller_before);
            let after_body = evidence.after.profiles.body(caller_after);

            let added = after_body.minus(before_body);
            let overlap = containment(inlined_body, &added);
            trace!(
                inlined = %inlined.display_name(),
                caller = %evidence.after.tree[caller_after].display_name(),
                overlap,
                "inline overlap"
            );
            if overlap < config.inline_min_overlap {
                continue;
            }

            candidates.push(Candidate {
                family: DetectorFamily::ExtractInline,
                relationship: Relationship::between(
                    RelationshipKind::InlineOperation,
                    inlined,
                    &evidence.after.tree[caller_after],
                    overlap,
                ),
                claims: vec![(Entity::Before(inlined.id), Axis::Origin)],
            });
        }
    }

    candidates
}
