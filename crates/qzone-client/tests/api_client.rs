//! Integration tests for `ApiClient` against a local `wiremock` server.

use qzone_client::{ApiClient, ApiError, NearbyQuery, TokenHolder, TokenPair};
use qzone_core::Coordinate;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer, tokens: TokenHolder) -> ApiClient {
    ApiClient::new(&server.uri(), 5, "qzone-test/0.1", tokens)
        .expect("failed to build test ApiClient")
}

fn signed_in() -> TokenHolder {
    TokenHolder::new(Some(TokenPair {
        access_token: "access-abc".to_string(),
        refresh_token: "refresh-abc".to_string(),
    }))
}

fn shanghai_query(precision: u8) -> NearbyQuery {
    NearbyQuery::new(Coordinate::new(31.2304, 121.4737), 5_000.0, precision, 50)
}

// ---------------------------------------------------------------------------
// Sign-in
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_posts_token_and_stores_returned_pair() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .and(body_json(json!({"token": "third-party-xyz"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "new-access",
            "refreshToken": "new-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenHolder::default();
    let client = test_client(&server, tokens.clone());
    let pair = client.login("third-party-xyz").await.unwrap();

    assert_eq!(pair.access_token, "new-access");
    assert_eq!(tokens.access_token().as_deref(), Some("new-access"));
}

#[tokio::test]
async fn login_never_sends_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "a",
            "refreshToken": "r"
        })))
        .mount(&server)
        .await;

    // Even with a stale token in the holder, login goes out unauthenticated.
    let client = test_client(&server, signed_in());
    client.login("t").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn third_party_auth_uses_its_own_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/third-party"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "tp-access",
            "refreshToken": "tp-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenHolder::default();
    let client = test_client(&server, tokens.clone());
    client.third_party_auth("t").await.unwrap();

    assert_eq!(tokens.access_token().as_deref(), Some("tp-access"));
}

#[tokio::test]
async fn failed_login_leaves_tokens_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/register"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tokens = signed_in();
    let client = test_client(&server, tokens.clone());
    let err = client.register("t").await.unwrap_err();

    assert!(matches!(err, ApiError::UnexpectedStatus { status: 500, .. }));
    assert_eq!(tokens.access_token().as_deref(), Some("access-abc"));
}

// ---------------------------------------------------------------------------
// Nearby search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nearby_sends_bearer_and_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/locations/nearby"))
        .and(header("authorization", "Bearer access-abc"))
        .and(body_json(json!({
            "latitude": 31.2304,
            "longitude": 121.4737,
            "radiusKm": 5.0,
            "precision": 8,
            "maxResults": 50,
            "includeDistance": true,
            "sortByDistance": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "ok",
            "data": [{
                "documentId": "loc-1",
                "title": "Bund Viewpoint",
                "description": "Riverside",
                "latitude": 31.2400,
                "longitude": 121.4900,
                "distance": 1780.5
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, signed_in());
    let response = client.nearby_locations(&shanghai_query(8)).await.unwrap();

    assert!(response.has_results());
    assert_eq!(response.data[0].document_id, "loc-1");
    assert_eq!(response.data[0].distance, Some(1780.5));
}

#[tokio::test]
async fn nearby_without_token_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/locations/nearby"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "data": []})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server, TokenHolder::default());
    let response = client.nearby_locations(&shanghai_query(9)).await.unwrap();

    assert!(!response.has_results());
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn nearby_maps_401_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/locations/nearby"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server, signed_in());
    let err = client.nearby_locations(&shanghai_query(9)).await.unwrap_err();

    assert!(
        matches!(err, ApiError::Unauthorized { .. }),
        "expected Unauthorized, got: {err:?}"
    );
}

#[tokio::test]
async fn nearby_malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/locations/nearby"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server, signed_in());
    let err = client.nearby_locations(&shanghai_query(9)).await.unwrap_err();

    assert!(matches!(err, ApiError::Deserialize { .. }));
}

#[tokio::test]
async fn nearby_server_error_is_attempted_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/locations/nearby"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, signed_in());
    let err = client.nearby_locations(&shanghai_query(9)).await.unwrap_err();

    assert!(matches!(err, ApiError::UnexpectedStatus { status: 503, .. }));
}
