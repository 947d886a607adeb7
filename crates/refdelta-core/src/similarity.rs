//! Lexical similarity between declarations
//!
//! All scores lie in [0, 1]. Token bags are ordered maps so that every sum
//! below is computed in the same order on every run.

use std::collections::BTreeMap;

use crate::config::SimilarityWeights;
use crate::model::{Node, NodeId, Signature};
use crate::tree::Tree;

/// Body tokens of the form `call(name)` are call-references to `name`.
const CALL_PREFIX: &str = "call(";

/// Simple name referenced by a call token, if `token` is one.
pub fn call_target(token: &str) -> Option<&str> {
    token
        .strip_prefix(CALL_PREFIX)
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|name| !name.is_empty())
}

/// Multiset of body tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBag {
    counts: BTreeMap<String, usize>,
    total: usize,
}

impl TokenBag {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bag = TokenBag::default();
        for token in tokens {
            bag.add(token.as_ref(), 1);
        }
        bag
    }

    fn add(&mut self, token: &str, count: usize) {
        if count == 0 {
            return;
        }
        *self.counts.entry(token.to_string()).or_insert(0) += count;
        self.total += count;
    }

    /// Total number of tokens, counting multiplicity.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn count(&self, token: &str) -> usize {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// Number of `call(name)` references in this bag.
    pub fn calls_to(&self, name: &str) -> usize {
        self.count(&format!("{CALL_PREFIX}{name})"))
    }

    /// Simple names this bag calls, in lexical order.
    pub fn call_targets(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().filter_map(|token| call_target(token))
    }

    /// Multiset difference `self - other`.
    pub fn minus(&self, other: &TokenBag) -> TokenBag {
        let mut result = TokenBag::default();
        for (token, &count) in &self.counts {
            result.add(token, count.saturating_sub(other.count(token)));
        }
        result
    }

    /// Size of the multiset intersection.
    pub fn intersection_len(&self, other: &TokenBag) -> usize {
        self.counts
            .iter()
            .map(|(token, &count)| count.min(other.count(token)))
            .sum()
    }

    /// Size of the multiset union.
    pub fn union_len(&self, other: &TokenBag) -> usize {
        self.total + other.total - self.intersection_len(other)
    }
}

/// |A ∩ B| / |A ∪ B| over multisets. Two empty bags are identical.
pub fn jaccard(a: &TokenBag, b: &TokenBag) -> f64 {
    let union = a.union_len(b);
    if union == 0 {
        return 1.0;
    }
    a.intersection_len(b) as f64 / union as f64
}

/// Fraction of `part` that is found inside `whole`. Zero for an empty `part`.
pub fn containment(part: &TokenBag, whole: &TokenBag) -> f64 {
    if part.is_empty() {
        return 0.0;
    }
    part.intersection_len(whole) as f64 / part.len() as f64
}

/// Split an identifier into lower-cased sub-tokens on case changes,
/// underscores, dashes, dollars and digit boundaries.
///
/// `parseHTTPResponse2` becomes `["parse", "http", "response", "2"]`.
pub fn split_identifier(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_ascii_digit() != c.is_ascii_digit() && prev.is_alphanumeric())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Levenshtein distance over arbitrary sequences.
fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, x) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(x != y);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// 1 - normalized edit distance. Two empty sequences are identical.
pub fn sequence_similarity<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / longest as f64
}

/// Similarity of two identifiers at sub-token granularity.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    sequence_similarity(&split_identifier(a), &split_identifier(b))
}

/// Similarity of two parameter lists. Absent on both sides counts as equal.
pub fn signature_similarity(a: Option<&Signature>, b: Option<&Signature>) -> f64 {
    match (a, b) {
        (None, None) => 1.0,
        (Some(a), Some(b)) => sequence_similarity(a.params(), b.params()),
        _ => 0.0,
    }
}

/// Precomputed lexical view of one node.
#[derive(Debug, Clone)]
pub struct NodeProfile {
    pub name_tokens: Vec<String>,
    pub body: TokenBag,
}

/// Profiles for every node of a tree, indexed by NodeId.
#[derive(Debug, Clone)]
pub struct Profiles {
    profiles: Vec<NodeProfile>,
}

impl Profiles {
    pub fn build(tree: &Tree) -> Self {
        Profiles {
            profiles: tree
                .nodes()
                .map(|node| NodeProfile {
                    name_tokens: split_identifier(&node.simple_name),
                    body: TokenBag::from_tokens(&node.body_tokens),
                })
                .collect(),
        }
    }

    pub fn get(&self, id: NodeId) -> &NodeProfile {
        &self.profiles[id.index()]
    }

    pub fn body(&self, id: NodeId) -> &TokenBag {
        &self.get(id).body
    }
}

/// Weighted similarity between a before-node and an after-node.
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    weights: &'a SimilarityWeights,
    before: &'a Profiles,
    after: &'a Profiles,
}

impl<'a> Scorer<'a> {
    pub fn new(weights: &'a SimilarityWeights, before: &'a Profiles, after: &'a Profiles) -> Self {
        Scorer {
            weights,
            before,
            after,
        }
    }

    /// `wName·nameSim + wSig·signatureSim + wBody·bodyJaccard`, divided by
    /// the weight sum. When both bodies are empty the body term is dropped.
    pub fn score(&self, b: &Node, a: &Node) -> f64 {
        let pb = self.before.get(b.id);
        let pa = self.after.get(a.id);

        let name = sequence_similarity(&pb.name_tokens, &pa.name_tokens);
        let signature = signature_similarity(b.signature.as_ref(), a.signature.as_ref());

        let w = self.weights;
        if pb.body.is_empty() && pa.body.is_empty() {
            let denominator = w.name + w.signature;
            if denominator <= 0.0 {
                return (name + signature) / 2.0;
            }
            return (w.name * name + w.signature * signature) / denominator;
        }

        let body = jaccard(&pb.body, &pa.body);
        let numerator = w.name * name + w.signature * signature + w.body * body;
        let denominator = w.name + w.signature + w.body;
        (numerator / denominator).clamp(0.0, 1.0)
    }
}
