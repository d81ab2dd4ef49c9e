use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::canonicalize::{canonicalize_edge, canonicalize_node, merge_duplicate_nodes};
use crate::conflation::ConflationConfig;
use crate::error::KgError;
use crate::graph::{EdgeRecord, NodeRecord};
use crate::nodenorm::ResolutionClient;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStats {
    pub nodes_in: usize,
    pub nodes_out: usize,
    pub nodes_dropped: usize,
    pub nodes_merged: usize,
    pub edges_in: usize,
    pub edges_out: usize,
    pub edges_dropped: usize,
    /// Distinct node identifiers the oracle could not resolve, sorted.
    pub unresolved_ids: Vec<String>,
    /// Ids of edges dropped because an endpoint had no canonical identity.
    pub dropped_edges: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NormalizedGraph<N, E> {
    pub nodes: Vec<N>,
    pub edges: Vec<E>,
    pub stats: NormalizationStats,
}

/// Canonicalizes node and edge batches with one resolution call per batch.
#[derive(Debug, Clone)]
pub struct Normalizer<C> {
    client: C,
    conflation: ConflationConfig,
    merge_duplicates: bool,
}

impl<C: ResolutionClient> Normalizer<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            conflation: ConflationConfig::default(),
            merge_duplicates: false,
        }
    }

    pub fn with_conflation(mut self, conflation: ConflationConfig) -> Self {
        self.conflation = conflation;
        self
    }

    pub fn with_merge_duplicates(mut self, merge_duplicates: bool) -> Self {
        self.merge_duplicates = merge_duplicates;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn conflation(&self) -> ConflationConfig {
        self.conflation
    }

    pub fn normalize<N, E>(
        &self,
        nodes: Vec<N>,
        edges: Vec<E>,
    ) -> Result<NormalizedGraph<N, E>, KgError>
    where
        N: NodeRecord,
        E: EdgeRecord,
    {
        self.normalize_with(nodes, edges, self.conflation)
    }

    /// Resolve every node id once, rewrite nodes, then rewrite edges through
    /// the original-id to canonical-id mapping built from the node pass.
    ///
    /// Unresolved nodes and edges touching them are dropped and counted.
    /// Resolution service failures abort the whole batch.
    pub fn normalize_with<N, E>(
        &self,
        nodes: Vec<N>,
        edges: Vec<E>,
        conflation: ConflationConfig,
    ) -> Result<NormalizedGraph<N, E>, KgError>
    where
        N: NodeRecord,
        E: EdgeRecord,
    {
        let mut stats = NormalizationStats {
            nodes_in: nodes.len(),
            edges_in: edges.len(),
            ..NormalizationStats::default()
        };

        let curies = nodes
            .iter()
            .map(|node| node.id().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if curies.is_empty() {
            stats.edges_dropped = edges.len();
            stats.dropped_edges = edges.iter().map(|edge| edge.id().to_string()).collect();
            return Ok(NormalizedGraph {
                nodes: Vec::new(),
                edges: Vec::new(),
                stats,
            });
        }

        let resolutions = self.client.resolve(&curies, conflation)?;

        let mut mapping: HashMap<String, String> = HashMap::with_capacity(curies.len());
        let mut unresolved = BTreeSet::new();
        let mut normalized_nodes = Vec::with_capacity(nodes.len());
        for node in nodes {
            let original_id = node.id().to_string();
            let record = resolutions.get(&original_id).and_then(Option::as_ref);
            match canonicalize_node(node, record) {
                Some(node) => {
                    mapping.insert(original_id, node.id().to_string());
                    normalized_nodes.push(node);
                }
                None => {
                    debug!(id = %original_id, "dropping unresolved node");
                    stats.nodes_dropped += 1;
                    unresolved.insert(original_id);
                }
            }
        }

        let mut normalized_edges = Vec::with_capacity(edges.len());
        for edge in edges {
            let edge_id = edge.id().to_string();
            let (subject, object) = (edge.subject().to_string(), edge.object().to_string());
            match canonicalize_edge(edge, &mapping) {
                Some(edge) => normalized_edges.push(edge),
                None => {
                    debug!(
                        id = %edge_id,
                        %subject,
                        %object,
                        "dropping edge with unresolved endpoint"
                    );
                    stats.edges_dropped += 1;
                    stats.dropped_edges.push(edge_id);
                }
            }
        }

        if self.merge_duplicates {
            let (merged, folded) = merge_duplicate_nodes(normalized_nodes);
            normalized_nodes = merged;
            stats.nodes_merged = folded;
        }

        stats.nodes_out = normalized_nodes.len();
        stats.edges_out = normalized_edges.len();
        stats.unresolved_ids = unresolved.into_iter().collect();

        info!(
            nodes_in = stats.nodes_in,
            nodes_out = stats.nodes_out,
            nodes_dropped = stats.nodes_dropped,
            nodes_merged = stats.nodes_merged,
            edges_in = stats.edges_in,
            edges_out = stats.edges_out,
            edges_dropped = stats.edges_dropped,
            conflation = %conflation.tag(),
            "normalized graph batch"
        );

        Ok(NormalizedGraph {
            nodes: normalized_nodes,
            edges: normalized_edges,
            stats,
        })
    }
}

/// One-shot normalization with explicit conflation flags.
pub fn normalize<C, N, E>(
    client: &C,
    nodes: Vec<N>,
    edges: Vec<E>,
    gp_conflate: bool,
    dc_conflate: bool,
) -> Result<NormalizedGraph<N, E>, KgError>
where
    C: ResolutionClient + ?Sized,
    N: NodeRecord,
    E: EdgeRecord,
{
    Normalizer::new(client).normalize_with(
        nodes,
        edges,
        ConflationConfig::new(gp_conflate, dc_conflate),
    )
}
