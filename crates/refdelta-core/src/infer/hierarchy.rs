//! Pull Up and Push Down of operations and attributes

use std::collections::BTreeMap;

use tracing::trace;

use super::{Axis, Candidate, Entity, Evidence};
use crate::config::{DetectorFamily, InferenceConfig};
use crate::model::{Node, NodeKind, Signature};
use crate::relationship::{Relationship, RelationshipKind};
use crate::similarity::jaccard;

type MemberKey<'n> = (NodeKind, &'n str, Option<&'n Signature>);

fn member_key(node: &Node) -> MemberKey<'_> {
    (node.kind, node.simple_name.as_str(), node.signature.as_ref())
}

/// Matched members whose container moved up or down the type hierarchy,
/// plus the residual copies the injective matcher could not pair.
pub(crate) fn detect(evidence: &Evidence<'_>, config: &InferenceConfig) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut pulled_up: BTreeMap<MemberKey<'_>, Vec<&Node>> = BTreeMap::new();
    let mut pushed_down: BTreeMap<MemberKey<'_>, Vec<&Node>> = BTreeMap::new();

    for (b, a, m) in evidence.pairs() {
        if !b.kind.is_member() || b.simple_name != a.simple_name || evidence.keeps_container(b, a) {
            continue;
        }
        let (Some(from), Some(to)) = (b.container_id, a.container_id) else {
            continue;
        };

        let kind = if evidence.is_pull_up(from, to) {
            pulled_up.entry(member_key(a)).or_default().push(a);
            RelationshipKind::pull_up(b.kind)
        } else if evidence.is_push_down(from, to) {
            pushed_down.entry(member_key(b)).or_default().push(b);
            RelationshipKind::push_down(b.kind)
        } else {
            continue;
        };

        trace!(?kind, before = %b.display_name(), after = %a.display_name(), "hierarchy candidate");
        candidates.push(Candidate {
            family: DetectorFamily::Hierarchy,
            relationship: Relationship::between(kind, b, a, m.similarity),
            claims: vec![(Entity::Before(b.id), Axis::ContainerChange)],
        });
    }

    // Further copies pulled up from sibling subtypes.
    for residual in evidence.unmatched_before() {
        let (Some(targets), Some(from)) = (pulled_up.get(&member_key(residual)), residual.container_id) else {
            continue;
        };
        let best = best_sibling(targets, config, |target| {
            target
                .container_id
                .filter(|&to| evidence.is_pull_up(from, to))
                .map(|_| {
                    jaccard(
                        evidence.before.profiles.body(residual.id),
                        evidence.after.profiles.body(target.id),
                    )
                })
        });
        if let Some((target, similarity)) = best {
            candidates.push(Candidate {
                family: DetectorFamily::Hierarchy,
                relationship: Relationship::between(
                    RelationshipKind::pull_up(residual.kind),
                    residual,
                    target,
                    similarity,
                ),
                claims: vec![(Entity::Before(residual.id), Axis::Origin)],
            });
        }
    }

    // Further copies pushed down into sibling subtypes.
    for residual in evidence.unmatched_after() {
        let (Some(sources), Some(to)) = (pushed_down.get(&member_key(residual)), residual.container_id) else {
            continue;
        };
        let best = best_sibling(sources, config, |source| {
            source
                .container_id
                .filter(|&from| evidence.is_push_down(from, to))
                .map(|_| {
                    jaccard(
                        evidence.before.profiles.body(source.id),
                        evidence.after.profiles.body(residual.id),
                    )
                })
        });
        if let Some((source, similarity)) = best {
            candidates.push(Candidate {
                family: DetectorFamily::Hierarchy,
                relationship: Relationship::between(
                    RelationshipKind::push_down(residual.kind),
                    source,
                    residual,
                    similarity,
                ),
                claims: vec![(Entity::After(residual.id), Axis::Origin)],
            });
        }
    }

    candidates
}

/// Highest-scoring counterpart above the sibling threshold; ties go to the
/// smaller display name.
fn best_sibling<'n>(
    counterparts: &[&'n Node],
    config: &InferenceConfig,
    score: impl Fn(&Node) -> Option<f64>,
) -> Option<(&'n Node, f64)> {
    counterparts
        .iter()
        .filter_map(|&node| score(node).map(|similarity| (node, similarity)))
        .filter(|&(_, similarity)| similarity >= config.sibling_min_similarity)
        .min_by(|(x, sx), (y, sy)| {
            sy.total_cmp(sx)
                .then_with(|| x.display_name().cmp(&y.display_name()))
        })
}
