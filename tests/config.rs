use std::fs;

use assert_matches::assert_matches;

use kira_kg_normalizer::config::{ConfigLoader, NodeNormSettings};
use kira_kg_normalizer::conflation::ConflationConfig;
use kira_kg_normalizer::error::KgError;

#[test]
fn explicit_config_overrides_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-kg.json");
    fs::write(
        &path,
        r#"{
            "nodenorm": { "endpoint": "http://localhost:8080/get_normalized_nodes", "max_retries": 0 },
            "conflation": { "gene_protein": false, "drug_chemical": true },
            "cache": { "enabled": true, "path": "/tmp/nn-cache.json" },
            "merge_duplicates": true
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(
        resolved.nodenorm,
        NodeNormSettings {
            endpoint: "http://localhost:8080/get_normalized_nodes".to_string(),
            timeout_secs: NodeNormSettings::default().timeout_secs,
            max_retries: 0,
        }
    );
    assert_eq!(resolved.conflation, ConflationConfig::new(false, true));
    assert!(resolved.cache.enabled);
    assert_eq!(resolved.cache.path.as_deref().map(|p| p.as_str()), Some("/tmp/nn-cache.json"));
    assert!(resolved.merge_duplicates);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, KgError::ConfigRead(_));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-kg.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, KgError::ConfigParse(_));
}
