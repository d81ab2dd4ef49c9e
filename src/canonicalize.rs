//! Node and edge canonicalization over precomputed resolutions.

use std::collections::{HashMap, HashSet};

use crate::graph::{EdgeRecord, NodeRecord};
use crate::nodenorm::ResolutionRecord;

/// Rewrite `node` onto the canonical identity in `record`.
///
/// Returns `None` when the node's identifier did not resolve. The previous
/// id and every non-canonical class member land in `xref`; the previous name
/// and every class label land in `synonym`. Neither list ever repeats the
/// node's final `id` or `name`.
pub fn canonicalize_node<N: NodeRecord>(
    mut node: N,
    record: Option<&ResolutionRecord>,
) -> Option<N> {
    let record = record?;
    let old_id = node.id().to_string();
    let old_name = node.name().map(str::to_string);

    node.set_id(record.canonical_id.clone());
    if let Some(label) = &record.canonical_label {
        node.set_name(Some(label.clone()));
    }

    let xref = {
        let additions = std::iter::once(old_id.as_str()).chain(
            record
                .equivalence_class
                .iter()
                .map(|member| member.identifier.as_str())
                .filter(|identifier| *identifier != record.canonical_id),
        );
        fold_unique(node.xref(), additions, &[node.id()])
    };
    node.set_xref(xref);

    let synonym = {
        let canonical_label = record.canonical_label.as_deref();
        let class_labels = record.labels.iter().map(String::as_str).chain(
            record
                .equivalence_class
                .iter()
                .filter_map(|member| member.label.as_deref()),
        );
        let additions = old_name
            .as_deref()
            .into_iter()
            .chain(class_labels.filter(|label| Some(*label) != canonical_label));
        let mut exclude = Vec::with_capacity(2);
        exclude.extend(canonical_label);
        exclude.extend(node.name());
        fold_unique(node.synonym(), additions, &exclude)
    };
    node.set_synonym(synonym);

    Some(node)
}

/// Point `edge` at the canonical ids of its endpoints.
///
/// `mapping` is keyed by original node id. Returns `None` when either
/// endpoint has no entry.
pub fn canonicalize_edge<E: EdgeRecord>(
    mut edge: E,
    mapping: &HashMap<String, String>,
) -> Option<E> {
    let subject = mapping.get(edge.subject())?.clone();
    let object = mapping.get(edge.object())?.clone();
    edge.set_subject(subject);
    edge.set_object(object);
    Some(edge)
}

/// Fold nodes sharing a canonical id into the first occurrence.
///
/// Cross-references and synonyms are unioned; other fields of the first node
/// win. Returns the merged nodes and how many were folded away.
pub fn merge_duplicate_nodes<N: NodeRecord>(nodes: Vec<N>) -> (Vec<N>, usize) {
    let mut merged: Vec<N> = Vec::with_capacity(nodes.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut folded = 0usize;

    for node in nodes {
        let Some(&position) = positions.get(node.id()) else {
            positions.insert(node.id().to_string(), merged.len());
            merged.push(node);
            continue;
        };

        folded += 1;
        let target = &mut merged[position];
        if target.name().is_none() {
            target.set_name(node.name().map(str::to_string));
        }

        let xref = fold_unique(
            target.xref(),
            node.xref().iter().map(String::as_str),
            &[target.id()],
        );
        target.set_xref(xref);

        let exclude = target.name().into_iter().collect::<Vec<_>>();
        let synonym = fold_unique(
            target.synonym(),
            node.name()
                .into_iter()
                .chain(node.synonym().iter().map(String::as_str)),
            &exclude,
        );
        target.set_synonym(synonym);
    }

    (merged, folded)
}

/// `existing` followed by `additions`, first occurrence wins, minus `exclude`.
fn fold_unique<'a>(
    existing: &'a [String],
    additions: impl IntoIterator<Item = &'a str>,
    exclude: &[&str],
) -> Vec<String> {
    let mut seen: HashSet<&str> = exclude.iter().copied().collect();
    existing
        .iter()
        .map(String::as_str)
        .chain(additions)
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}
