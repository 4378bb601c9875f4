#![allow(clippy::unwrap_used)]
// Integration tests for `RestClient` using wiremock.

use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netdesk_api::{Error, ListParams, Mutation, RestClient, TransportConfig};

#[derive(Debug, Deserialize, PartialEq)]
struct Device {
    id: i64,
    name: String,
    active: bool,
}

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let client = RestClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    (server, client)
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_page_sends_pagination_params() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "2"))
        .and(query_param("search", "lab"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": 3, "name": "lab-pc-3", "active": true },
                { "id": 4, "name": "lab-pc-4", "active": false }
            ],
            "page": 2,
            "pageSize": 2,
            "totalCount": 5,
            "totalPages": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .list_page::<Device>(
            "devices",
            &ListParams {
                page: 2,
                page_size: 2,
                search: "lab",
            },
        )
        .await
        .unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.total_count, 5);
    assert_eq!(page.total_pages, Some(3));
    assert_eq!(
        page.items,
        vec![
            Device {
                id: 3,
                name: "lab-pc-3".into(),
                active: true
            },
            Device {
                id: 4,
                name: "lab-pc-4".into(),
                active: false
            },
        ]
    );
}

#[tokio::test]
async fn test_list_page_tolerates_missing_total_pages() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "page": 1,
            "pageSize": 10,
            "totalCount": 0
        })))
        .mount(&server)
        .await;

    let page = client
        .list_page::<Device>(
            "users",
            &ListParams {
                page: 1,
                page_size: 10,
                search: "",
            },
        )
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, None);
}

#[tokio::test]
async fn test_list_page_bad_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client
        .list_page::<Device>(
            "devices",
            &ListParams {
                page: 1,
                page_size: 10,
                search: "",
            },
        )
        .await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_active_patches_item() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/devices/7"))
        .and(body_json(json!({ "active": false })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .mutate("devices", 7, Mutation::SetActive(false))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_item() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/users/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.mutate("users", 12, Mutation::Delete).await.unwrap();
}

#[tokio::test]
async fn test_reset_password_posts_action() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/users/12/reset-password"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .mutate("users", 12, Mutation::ResetPassword)
        .await
        .unwrap();
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_structured_error_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/devices/1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "message": "device is rented out",
            "code": "device.in_use"
        })))
        .mount(&server)
        .await;

    let err = client
        .mutate("devices", 1, Mutation::Delete)
        .await
        .unwrap_err();

    match err {
        Error::Api {
            message,
            code,
            status,
        } => {
            assert_eq!(status, 409);
            assert_eq!(message, "device is rented out");
            assert_eq!(code.as_deref(), Some("device.in_use"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client
        .list_page::<Device>(
            "devices",
            &ListParams {
                page: 1,
                page_size: 10,
                search: "",
            },
        )
        .await;

    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_bearer_token_header_is_sent() {
    let server = MockServer::start().await;
    let transport = TransportConfig {
        token: Some("s3cret".to_string().into()),
        ..TransportConfig::default()
    };
    let client = RestClient::new(&server.uri(), &transport).unwrap();

    Mock::given(method("DELETE"))
        .and(path("/devices/2"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.mutate("devices", 2, Mutation::Delete).await.unwrap();
}
