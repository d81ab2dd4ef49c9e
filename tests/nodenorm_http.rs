use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use assert_matches::assert_matches;

use kira_kg_normalizer::config::NodeNormSettings;
use kira_kg_normalizer::conflation::ConflationConfig;
use kira_kg_normalizer::error::KgError;
use kira_kg_normalizer::nodenorm::{NodeNormHttpClient, NodeNormRequest, ResolutionClient};

const WRN_BODY: &str = r#"{"HGNC:12791": {"id": {"identifier": "NCBIGene:7486", "label": "WRN"}, "equivalent_identifiers": [{"identifier": "HGNC:12791"}], "type": ["biolink:Gene"]}}"#;

/// Answer one connection per scripted response and return the request bodies.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!(
        "http://{}/get_normalized_nodes",
        listener.local_addr().unwrap()
    );
    let handle = thread::spawn(move || {
        let mut bodies = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            bodies.push(read_request_body(&mut stream));
            let reason = if status == 200 { "OK" } else { "Service Unavailable" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
        bodies
    });
    (endpoint, handle)
}

fn read_request_body(stream: &mut TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = stream.read(&mut chunk).unwrap();
        assert!(read > 0, "connection closed before request completed");
        buffer.extend_from_slice(&chunk[..read]);
        let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buffer[..end]).to_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        let start = end + 4;
        while buffer.len() < start + length {
            let read = stream.read(&mut chunk).unwrap();
            assert!(read > 0, "connection closed before body completed");
            buffer.extend_from_slice(&chunk[..read]);
        }
        return String::from_utf8(buffer[start..start + length].to_vec()).unwrap();
    }
}

fn client(endpoint: String, max_retries: usize) -> NodeNormHttpClient {
    NodeNormHttpClient::with_settings(&NodeNormSettings {
        endpoint,
        timeout_secs: 10,
        max_retries,
    })
    .unwrap()
}

fn curies() -> Vec<String> {
    vec!["HGNC:12791".to_string()]
}

#[test]
fn request_body_carries_conflation_flags() {
    let curies = curies();
    let body = serde_json::to_value(NodeNormRequest::new(
        &curies,
        ConflationConfig::new(false, true),
    ))
    .unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "curies": ["HGNC:12791"],
            "conflate": false,
            "drug_chemical_conflate": true,
            "description": false
        })
    );
}

#[test]
fn conflation_flags_reach_the_wire() {
    let (endpoint, server) = serve(vec![(200, "{}"), (200, "{}")]);
    let client = client(endpoint, 0);

    client
        .resolve(&curies(), ConflationConfig::new(true, false))
        .unwrap();
    client
        .resolve(&curies(), ConflationConfig::new(false, true))
        .unwrap();

    let bodies = server
        .join()
        .unwrap()
        .iter()
        .map(|body| serde_json::from_str::<serde_json::Value>(body).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(bodies[0]["curies"], serde_json::json!(["HGNC:12791"]));
    assert_eq!(bodies[0]["conflate"], true);
    assert_eq!(bodies[0]["drug_chemical_conflate"], false);
    assert_eq!(bodies[1]["conflate"], false);
    assert_eq!(bodies[1]["drug_chemical_conflate"], true);
}

#[test]
fn unavailable_service_is_retried() {
    let (endpoint, server) = serve(vec![(503, "busy"), (200, WRN_BODY)]);
    let map = client(endpoint, 1)
        .resolve(&curies(), ConflationConfig::default())
        .unwrap();

    assert_eq!(server.join().unwrap().len(), 2);
    assert_eq!(
        map["HGNC:12791"].as_ref().unwrap().canonical_id,
        "NCBIGene:7486"
    );
}

#[test]
fn persistent_failure_surfaces_status() {
    let (endpoint, server) = serve(vec![(503, "busy"), (503, "still busy")]);
    let err = client(endpoint, 1)
        .resolve(&curies(), ConflationConfig::default())
        .unwrap_err();

    assert_eq!(server.join().unwrap().len(), 2);
    assert_matches!(err, KgError::NodeNormStatus { status: 503, .. });
    assert!(err.is_resolution_service_error());
}
