use std::collections::HashMap;

use kira_kg_normalizer::canonicalize::{canonicalize_edge, canonicalize_node, merge_duplicate_nodes};
use kira_kg_normalizer::graph::{GraphEdge, GraphNode};
use kira_kg_normalizer::nodenorm::{EquivalentIdentifier, ResolutionRecord};

fn wrn_record() -> ResolutionRecord {
    ResolutionRecord::new(
        "NCBIGene:7486",
        Some("WRN"),
        vec![
            EquivalentIdentifier::new("HGNC:12791", Some("WRN")),
            EquivalentIdentifier::new("OMIM:604611", None),
            EquivalentIdentifier::new("UniProtKB:Q14191", Some("WRN protein, human")),
        ],
        vec!["biolink:Gene".to_string()],
    )
}

#[test]
fn rewrites_node_onto_canonical_identity() {
    let node = GraphNode::new("HGNC:12791", Some("Werner Syndrome Locus"))
        .with_category("biolink:Gene");
    let node = canonicalize_node(node, Some(&wrn_record())).unwrap();

    assert_eq!(node.id, "NCBIGene:7486");
    assert_eq!(node.name.as_deref(), Some("WRN"));
    assert_eq!(node.category, vec!["biolink:Gene".to_string()]);
    for xref in ["HGNC:12791", "OMIM:604611", "UniProtKB:Q14191"] {
        assert!(node.xref.contains(&xref.to_string()), "missing xref {xref}");
    }
    assert!(!node.xref.contains(&"NCBIGene:7486".to_string()));
    assert!(node.synonym.contains(&"Werner Syndrome Locus".to_string()));
    assert!(node.synonym.contains(&"WRN protein, human".to_string()));
    assert!(!node.synonym.contains(&"WRN".to_string()));
}

#[test]
fn unresolved_node_is_dropped() {
    let node = GraphNode::new("foo:bar", Some("mystery"));
    assert!(canonicalize_node(node, None).is_none());
}

#[test]
fn already_canonical_node_has_no_self_reference() {
    let node = GraphNode::new("NCBIGene:7486", Some("WRN"));
    let once = canonicalize_node(node, Some(&wrn_record())).unwrap();

    assert_eq!(once.id, "NCBIGene:7486");
    assert!(!once.xref.contains(&"NCBIGene:7486".to_string()));
    assert!(!once.synonym.contains(&"WRN".to_string()));

    let twice = canonicalize_node(once.clone(), Some(&wrn_record())).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn existing_lists_are_kept_without_duplicates() {
    let mut node = GraphNode::new("HGNC:12791", None);
    node.xref = vec![
        "OMIM:604611".to_string(),
        "NCBIGene:7486".to_string(),
        "Orphanet:1".to_string(),
    ];
    node.synonym = vec!["RECQL2".to_string(), "WRN".to_string()];

    let node = canonicalize_node(node, Some(&wrn_record())).unwrap();

    assert_eq!(
        node.xref,
        vec![
            "OMIM:604611".to_string(),
            "Orphanet:1".to_string(),
            "HGNC:12791".to_string(),
            "UniProtKB:Q14191".to_string(),
        ]
    );
    assert_eq!(
        node.synonym,
        vec!["RECQL2".to_string(), "WRN protein, human".to_string()]
    );
}

#[test]
fn missing_canonical_label_keeps_name_out_of_synonyms() {
    let record = ResolutionRecord::new(
        "CHEBI:15365",
        None,
        vec![
            EquivalentIdentifier::new("DRUGBANK:DB00945", Some("aspirin")),
            EquivalentIdentifier::new("PUBCHEM.COMPOUND:2244", Some("Acetylsalicylic acid")),
        ],
        Vec::new(),
    );
    let node = GraphNode::new("DRUGBANK:DB00945", Some("aspirin"));
    let node = canonicalize_node(node, Some(&record)).unwrap();

    assert_eq!(node.id, "CHEBI:15365");
    assert_eq!(node.name.as_deref(), Some("aspirin"));
    assert_eq!(node.synonym, vec!["Acetylsalicylic acid".to_string()]);
    assert_eq!(
        node.xref,
        vec![
            "DRUGBANK:DB00945".to_string(),
            "PUBCHEM.COMPOUND:2244".to_string()
        ]
    );
}

#[test]
fn edge_endpoints_follow_mapping() {
    let mapping = HashMap::from([
        ("HGNC:12791".to_string(), "NCBIGene:7486".to_string()),
        ("OMIM:277700".to_string(), "MONDO:0010196".to_string()),
    ]);
    let edge = GraphEdge::new(
        "e1",
        "HGNC:12791",
        "biolink:gene_associated_with_condition",
        "OMIM:277700",
    );
    let edge = canonicalize_edge(edge, &mapping).unwrap();

    assert_eq!(edge.id, "e1");
    assert_eq!(edge.subject, "NCBIGene:7486");
    assert_eq!(edge.predicate, "biolink:gene_associated_with_condition");
    assert_eq!(edge.object, "MONDO:0010196");
}

#[test]
fn edge_with_unknown_endpoint_is_dropped() {
    let mapping = HashMap::from([("HGNC:12791".to_string(), "NCBIGene:7486".to_string())]);

    let unknown_object = GraphEdge::new("e1", "HGNC:12791", "biolink:related_to", "foo:bar");
    assert!(canonicalize_edge(unknown_object, &mapping).is_none());

    let unknown_subject = GraphEdge::new("e2", "foo:bar", "biolink:related_to", "HGNC:12791");
    assert!(canonicalize_edge(unknown_subject, &mapping).is_none());
}

#[test]
fn duplicate_canonical_nodes_are_folded() {
    let first = canonicalize_node(
        GraphNode::new("HGNC:12791", Some("Werner Syndrome Locus")),
        Some(&wrn_record()),
    )
    .unwrap();
    let mut second = GraphNode::new("NCBIGene:7486", Some("RecQ helicase like 2"));
    second.xref = vec!["Orphanet:2".to_string()];
    let second = canonicalize_node(second, Some(&wrn_record())).unwrap();
    let other = GraphNode::new("MONDO:0010196", Some("Werner syndrome"));

    let (merged, folded) = merge_duplicate_nodes(vec![first, other, second]);

    assert_eq!(folded, 1);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, "NCBIGene:7486");
    assert!(merged[0].xref.contains(&"Orphanet:2".to_string()));
    assert!(!merged[0].xref.contains(&"NCBIGene:7486".to_string()));
    assert!(merged[0].synonym.contains(&"RecQ helicase like 2".to_string()));
    assert!(!merged[0].synonym.contains(&"WRN".to_string()));
    assert_eq!(merged[1].id, "MONDO:0010196");
}
