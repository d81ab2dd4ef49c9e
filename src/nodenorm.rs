use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::NodeNormSettings;
use crate::conflation::ConflationConfig;
use crate::error::KgError;

pub const DEFAULT_NODENORM_ENDPOINT: &str =
    "https://nodenormalization-sri.renci.org/get_normalized_nodes";

/// One member of an equivalence class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalentIdentifier {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl EquivalentIdentifier {
    pub fn new(identifier: impl Into<String>, label: Option<&str>) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.map(str::to_string),
        }
    }
}

/// Canonical identity of one resolved identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub canonical_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_label: Option<String>,
    /// Canonical id first, then the remaining members without duplicates.
    pub equivalence_class: Vec<EquivalentIdentifier>,
    /// Every distinct label the oracle reported for the class, including the
    /// canonical member's own label and labels carried by repeated members.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl ResolutionRecord {
    pub fn new(
        canonical_id: impl Into<String>,
        canonical_label: Option<&str>,
        members: Vec<EquivalentIdentifier>,
        categories: Vec<String>,
    ) -> Self {
        let canonical_id = canonical_id.into();
        let canonical_label = canonical_label
            .filter(|label| !label.is_empty())
            .map(str::to_string);

        let mut labels = Vec::new();
        let mut seen_labels = HashSet::new();
        for label in canonical_label.iter() {
            seen_labels.insert(label.clone());
            labels.push(label.clone());
        }

        let mut positions = HashMap::new();
        positions.insert(canonical_id.clone(), 0usize);
        let mut equivalence_class = vec![EquivalentIdentifier {
            identifier: canonical_id.clone(),
            label: canonical_label.clone(),
        }];
        for member in members {
            if member.identifier.is_empty() {
                continue;
            }
            let label = member.label.filter(|label| !label.is_empty());
            if let Some(label) = &label {
                if seen_labels.insert(label.clone()) {
                    labels.push(label.clone());
                }
            }
            match positions.get(&member.identifier) {
                Some(&position) => {
                    let kept = &mut equivalence_class[position];
                    if kept.label.is_none() {
                        kept.label = label;
                    }
                }
                None => {
                    positions.insert(member.identifier.clone(), equivalence_class.len());
                    equivalence_class.push(EquivalentIdentifier {
                        identifier: member.identifier,
                        label,
                    });
                }
            }
        }

        Self {
            canonical_id,
            canonical_label,
            equivalence_class,
            labels,
            categories,
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.equivalence_class
            .iter()
            .any(|member| member.identifier == identifier)
    }
}

/// Total mapping from each requested identifier to its resolution, if any.
pub type ResolutionMap = HashMap<String, Option<ResolutionRecord>>;

/// A bulk identifier-resolution oracle.
///
/// Implementations make at most one batched lookup per call and return a
/// mapping with a key for every distinct requested identifier.
pub trait ResolutionClient: Send + Sync {
    fn resolve(
        &self,
        curies: &[String],
        conflation: ConflationConfig,
    ) -> Result<ResolutionMap, KgError>;
}

impl<T: ResolutionClient + ?Sized> ResolutionClient for &T {
    fn resolve(
        &self,
        curies: &[String],
        conflation: ConflationConfig,
    ) -> Result<ResolutionMap, KgError> {
        (**self).resolve(curies, conflation)
    }
}

/// Distinct identifiers in sorted order; an empty request is a caller error.
pub fn prepare_curies(curies: &[String]) -> Result<Vec<String>, KgError> {
    if curies.is_empty() {
        return Err(KgError::InvalidInput(
            "cannot resolve an empty identifier set".to_string(),
        ));
    }
    let distinct = curies.iter().cloned().collect::<BTreeSet<_>>();
    Ok(distinct.into_iter().collect())
}

/// JSON body of a node normalization lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeNormRequest<'a> {
    pub curies: &'a [String],
    pub conflate: bool,
    pub drug_chemical_conflate: bool,
    pub description: bool,
}

impl<'a> NodeNormRequest<'a> {
    pub fn new(curies: &'a [String], conflation: ConflationConfig) -> Self {
        Self {
            curies,
            conflate: conflation.gene_protein,
            drug_chemical_conflate: conflation.drug_chemical,
            description: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeNormEntry {
    id: EquivalentIdentifier,
    #[serde(default)]
    equivalent_identifiers: Vec<EquivalentIdentifier>,
    #[serde(rename = "type", default)]
    types: Vec<String>,
}

/// Parse a node normalization response body into a mapping over `requested`.
///
/// Identifiers the body does not mention are reported as unresolved.
pub fn parse_response(requested: &[String], body: &str) -> Result<ResolutionMap, KgError> {
    let mut entries: HashMap<String, Option<NodeNormEntry>> =
        serde_json::from_str(body).map_err(|err| KgError::NodeNormResponse(err.to_string()))?;

    let mut resolved = ResolutionMap::with_capacity(requested.len());
    for curie in requested {
        let record = match entries.remove(curie).flatten() {
            Some(entry) => {
                if entry.id.identifier.is_empty() {
                    return Err(KgError::NodeNormResponse(format!(
                        "missing canonical identifier for {curie}"
                    )));
                }
                Some(ResolutionRecord::new(
                    entry.id.identifier,
                    entry.id.label.as_deref(),
                    entry.equivalent_identifiers,
                    entry.types,
                ))
            }
            None => None,
        };
        resolved.insert(curie.clone(), record);
    }
    Ok(resolved)
}

#[derive(Clone)]
pub struct NodeNormHttpClient {
    client: Client,
    endpoint: String,
    max_retries: usize,
}

impl NodeNormHttpClient {
    pub fn new() -> Result<Self, KgError> {
        Self::with_settings(&NodeNormSettings::default())
    }

    pub fn with_settings(settings: &NodeNormSettings) -> Result<Self, KgError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-kg/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KgError::NodeNormHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|err| KgError::NodeNormHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            max_retries: settings.max_retries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, KgError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        warn!(
                            status,
                            attempt,
                            delay_ms = delay,
                            "retrying node normalization request"
                        );
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        warn!(
                            error = %err,
                            attempt,
                            delay_ms = delay,
                            "retrying node normalization request"
                        );
                        std::thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(KgError::NodeNormHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, KgError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "node normalization request failed".to_string());
        Err(KgError::NodeNormStatus { status, message })
    }
}

impl ResolutionClient for NodeNormHttpClient {
    fn resolve(
        &self,
        curies: &[String],
        conflation: ConflationConfig,
    ) -> Result<ResolutionMap, KgError> {
        let curies = prepare_curies(curies)?;
        let request = NodeNormRequest::new(&curies, conflation);
        debug!(
            endpoint = %self.endpoint,
            batch = curies.len(),
            conflation = %conflation.tag(),
            "resolving identifiers"
        );

        let response = self.send_with_retries(|| self.client.post(&self.endpoint).json(&request))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| KgError::NodeNormHttp(err.to_string()))?;

        parse_response(&curies, &body)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
