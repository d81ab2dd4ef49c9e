use serde::{Deserialize, Serialize};

/// Conflation toggles threaded unchanged into every resolution call.
///
/// Gene/protein conflation folds a gene and its protein product into one
/// identity. Drug/chemical conflation merges drugs with their broader
/// chemical identities and is opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflationConfig {
    #[serde(default = "default_gene_protein")]
    pub gene_protein: bool,
    #[serde(default = "default_drug_chemical")]
    pub drug_chemical: bool,
}

pub const DEFAULT_GENE_PROTEIN_CONFLATION: bool = true;
pub const DEFAULT_DRUG_CHEMICAL_CONFLATION: bool = false;

impl ConflationConfig {
    pub fn new(gene_protein: bool, drug_chemical: bool) -> Self {
        Self {
            gene_protein,
            drug_chemical,
        }
    }

    /// Replace either toggle where an override is given.
    pub fn with_overrides(
        self,
        gene_protein: Option<bool>,
        drug_chemical: Option<bool>,
    ) -> Self {
        Self {
            gene_protein: gene_protein.unwrap_or(self.gene_protein),
            drug_chemical: drug_chemical.unwrap_or(self.drug_chemical),
        }
    }

    /// Stable short form used in cache keys and summaries, e.g. `gp=1,dc=0`.
    pub fn tag(&self) -> String {
        format!(
            "gp={},dc={}",
            u8::from(self.gene_protein),
            u8::from(self.drug_chemical)
        )
    }
}

impl Default for ConflationConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_GENE_PROTEIN_CONFLATION,
            DEFAULT_DRUG_CHEMICAL_CONFLATION,
        )
    }
}

fn default_gene_protein() -> bool {
    DEFAULT_GENE_PROTEIN_CONFLATION
}

fn default_drug_chemical() -> bool {
    DEFAULT_DRUG_CHEMICAL_CONFLATION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_conflate_genes_only() {
        let config = ConflationConfig::default();
        assert!(config.gene_protein);
        assert!(!config.drug_chemical);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ConflationConfig = serde_json::from_str(r#"{"drug_chemical": true}"#).unwrap();
        assert_eq!(config, ConflationConfig::new(true, true));
    }

    #[test]
    fn overrides_win_in_both_directions() {
        let from_file = ConflationConfig::new(false, true);
        assert_eq!(
            from_file.with_overrides(Some(true), Some(false)),
            ConflationConfig::new(true, false)
        );
        assert_eq!(from_file.with_overrides(None, None), from_file);
    }

    #[test]
    fn tag_is_stable() {
        assert_eq!(ConflationConfig::new(true, false).tag(), "gp=1,dc=0");
        assert_eq!(ConflationConfig::new(false, true).tag(), "gp=0,dc=1");
    }
}
