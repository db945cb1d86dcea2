//! Tests for the backend client against a mock server

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::QadClient;
use crate::error::InventoryError;

fn client(server: &MockServer) -> QadClient {
    QadClient::new(&server.uri(), "test-client")
}

fn inventory_json() -> serde_json::Value {
    serde_json::json!([
        {
            "ld_det.ld_domain": "CZ01",
            "ld_det.ld_site": "1000",
            "ld_det.ld_loc": "A1-05",
            "ld_det.ld_part": "P-100",
            "ld_det.ld_qty_oh": 4,
            "ld_det.ld_ref": "M0000078"
        },
        {
            "ld_det.ld_domain": "CZ01",
            "ld_det.ld_site": "1000",
            "ld_det.ld_loc": "B2-01",
            "ld_det.ld_part": "P-200",
            "ld_det.ld_qty_oh": "7.000",
            "ld_det.ld_ref": null
        }
    ])
}

// ── authenticate ─────────────────────────────────────────────────────

#[tokio::test]
async fn authenticate_returns_access_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=jnovak"))
        .and(body_string_contains("client_id=test-client"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access_token": "tok-123"})),
        )
        .mount(&mock_server)
        .await;

    let token = client(&mock_server)
        .authenticate("jnovak", "secret")
        .await
        .unwrap();
    assert_eq!(token, "tok-123");
}

#[tokio::test]
async fn authenticate_rejected_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).authenticate("jnovak", "wrong").await;
    assert!(matches!(result, Err(InventoryError::Auth)));
}

// ── fetch_domains ────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_domains_extracts_domain_codes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/webshell/workspaces"))
        .and(header("Authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "qad-qracore": [
                {"key": "w1", "name": "CZ01_Production", "description": "Plant", "default": true},
                {"key": "w2", "name": "DE02_Test"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let domains = client(&mock_server).fetch_domains("tok-123").await.unwrap();
    assert_eq!(domains.len(), 2);
    assert_eq!(domains[0].name, "CZ01");
    assert!(domains[0].is_default);
    assert_eq!(domains[1].name, "DE02");
    assert!(!domains[1].is_default);
}

#[tokio::test]
async fn fetch_domains_unexpected_shape_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/webshell/workspaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"other": []})))
        .mount(&mock_server)
        .await;

    let domains = client(&mock_server).fetch_domains("tok").await.unwrap();
    assert!(domains.is_empty());
}

// ── fetch_inventory ──────────────────────────────────────────────────

#[tokio::test]
async fn fetch_inventory_bare_array() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/qracore/browses"))
        .and(query_param("browseId", "urn:browse:mfg:aa800"))
        .and(query_param("filters", "ld_det.ld_domain EQ 'CZ01'"))
        .and(query_param("pageSize", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(inventory_json()))
        .mount(&mock_server)
        .await;

    let records = client(&mock_server)
        .fetch_inventory("tok", "CZ01")
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].qty_on_hand.as_deref(), Some("4"));
    assert_eq!(records[1].qty_on_hand.as_deref(), Some("7.000"));
    assert!(records[1].reference.is_none());
}

#[tokio::test]
async fn fetch_inventory_data_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/qracore/browses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": inventory_json()})),
        )
        .mount(&mock_server)
        .await;

    let records = client(&mock_server)
        .fetch_inventory("tok", "CZ01")
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].location(), "A1-05");
}

#[tokio::test]
async fn fetch_inventory_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/qracore/browses"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).fetch_inventory("tok", "CZ01").await;
    match result {
        Err(InventoryError::HttpStatus(status)) => assert_eq!(status.as_u16(), 500),
        other => panic!("Expected InventoryError::HttpStatus, got: {other:?}"),
    }
}
