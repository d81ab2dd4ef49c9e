use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::conflation::ConflationConfig;
use crate::domain::Curie;
use crate::error::KgError;
use crate::graph::GraphEdge;
use crate::graph_io::{read_edges, read_nodes, write_json, write_jsonl};
use crate::nodenorm::{ResolutionClient, ResolutionRecord};
use crate::normalizer::{NormalizationStats, Normalizer};

pub const NORMALIZED_NODES_FILE: &str = "normalized_nodes.jsonl";
pub const NORMALIZED_EDGES_FILE: &str = "normalized_edges.jsonl";
pub const SUMMARY_FILE: &str = "normalization_summary.json";

#[derive(Debug, Clone)]
pub struct NormalizeRequest {
    pub nodes_path: Utf8PathBuf,
    pub edges_path: Option<Utf8PathBuf>,
    pub out_dir: Utf8PathBuf,
    pub conflation: ConflationConfig,
    pub merge_duplicates: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizationSummary {
    pub tool_version: String,
    pub generated_at: String,
    pub conflation: ConflationConfig,
    pub input_nodes: String,
    pub input_edges: Option<String>,
    pub output_nodes: String,
    pub output_edges: String,
    pub stats: NormalizationStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub conflation: ConflationConfig,
    pub results: BTreeMap<String, Option<ResolutionRecord>>,
}

#[derive(Clone)]
pub struct App<C: ResolutionClient> {
    client: C,
}

impl<C: ResolutionClient> App<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Normalize a KGX node file and optional edge file into `out_dir`.
    pub fn normalize_files(
        &self,
        request: &NormalizeRequest,
    ) -> Result<NormalizationSummary, KgError> {
        let nodes = read_nodes(&request.nodes_path)?;
        let edges = match &request.edges_path {
            Some(path) => read_edges(path)?,
            None => Vec::<GraphEdge>::new(),
        };
        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            path = %request.nodes_path,
            "loaded graph files"
        );

        let normalizer = Normalizer::new(&self.client)
            .with_conflation(request.conflation)
            .with_merge_duplicates(request.merge_duplicates);
        let normalized = normalizer.normalize(nodes, edges)?;

        let output_nodes = request.out_dir.join(NORMALIZED_NODES_FILE);
        let output_edges = request.out_dir.join(NORMALIZED_EDGES_FILE);
        write_jsonl(&output_nodes, &normalized.nodes)?;
        write_jsonl(&output_edges, &normalized.edges)?;

        let summary = NormalizationSummary {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            conflation: request.conflation,
            input_nodes: request.nodes_path.to_string(),
            input_edges: request.edges_path.as_ref().map(|path| path.to_string()),
            output_nodes: output_nodes.to_string(),
            output_edges: output_edges.to_string(),
            stats: normalized.stats,
        };
        write_json(&request.out_dir.join(SUMMARY_FILE), &summary)?;
        Ok(summary)
    }

    /// Look up CURIEs directly, validating their shape first.
    pub fn resolve(
        &self,
        curies: &[String],
        conflation: ConflationConfig,
    ) -> Result<ResolveResult, KgError> {
        let curies = curies
            .iter()
            .map(|value| value.parse::<Curie>().map(String::from))
            .collect::<Result<Vec<_>, KgError>>()?;
        let results = self.client.resolve(&curies, conflation)?;
        Ok(ResolveResult {
            conflation,
            results: results.into_iter().collect(),
        })
    }
}
