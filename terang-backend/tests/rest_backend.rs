//! REST backend against a mock server.

use bytes::Bytes;
use serde_json::json;
use terang_backend::*;
use terang_config::BackendConfig;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, RestBackend) {
    let server = MockServer::start().await;
    let backend = RestBackend::new(&BackendConfig::new(server.uri(), "anon-key")).unwrap();
    (server, backend)
}

#[tokio::test]
async fn test_select_sends_postgrest_query() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/books"))
        .and(query_param("select", "*"))
        .and(query_param("is_published", "eq.true"))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1", "title": "Bumi Manusia"},
            {"id": "2", "title": "Cantik Itu Luka"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = backend
        .select(
            &Query::table("books")
                .eq("is_published", true)
                .order("created_at", Direction::Desc),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "42501",
            "message": "permission denied for table events"
        })))
        .mount(&server)
        .await;

    let err = backend.select(&Query::table("events")).await.unwrap_err();
    assert!(err.is_answer());
    assert_eq!(err.to_string(), "permission denied for table events");
}

#[tokio::test]
async fn test_single_missing_row_is_not_found() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/beans"))
        .and(header("accept", "application/vnd.pgrst.object+json"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned"
        })))
        .mount(&server)
        .await;

    let err = backend
        .select_single(&Query::table("beans").eq("id", "missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::NotFound(_)));
}

#[tokio::test]
async fn test_update_patches_by_id() {
    let (server, backend) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/menu_items"))
        .and(query_param("id", "eq.m1"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({"price": 32000})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "m1", "name": "Kopi Susu", "price": 32000})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let row = backend
        .update("menu_items", "m1", json!({"price": 32000}))
        .await
        .unwrap();
    assert_eq!(row["name"], "Kopi Susu");
}

#[tokio::test]
async fn test_sign_in_scopes_later_requests() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(body_json(json!({"email": "staff@terang.id", "password": "rahasia"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": {"id": "u-1", "email": "staff@terang.id"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/is_staff"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let mut changes = backend.on_auth_state_change();
    let session = backend
        .sign_in_with_password("staff@terang.id", "rahasia")
        .await
        .unwrap();
    assert_eq!(session.user.id, "u-1");
    assert_eq!(changes.recv().await.unwrap().event, AuthEvent::SignedIn);

    let backend = backend.into_backend();
    assert!(backend.is_staff().await.unwrap());
}

#[tokio::test]
async fn test_rejected_token_means_no_user() {
    let (server, backend) = setup().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT"})))
        .mount(&server)
        .await;

    let backend = backend.with_access_token("expired");
    assert!(backend.get_user().await.unwrap().is_none());
    assert!(backend.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_storage_upload_and_public_url() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/books/cover.png"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "books/cover.png"})))
        .expect(1)
        .mount(&server)
        .await;

    backend
        .upload("books", "cover.png", Bytes::from_static(b"\x89PNG"), "image/png")
        .await
        .unwrap();
    assert_eq!(
        backend.public_url("books", "cover.png"),
        format!("{}/storage/v1/object/public/books/cover.png", server.uri())
    );
}

#[tokio::test]
async fn test_object_names_are_encoded() {
    let (server, backend) = setup().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/books/kopi%20susu%23pagi%3F.png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "books/kopi"})))
        .expect(1)
        .mount(&server)
        .await;

    backend
        .upload("books", "kopi susu#pagi?.png", Bytes::from_static(b"\x89PNG"), "image/png")
        .await
        .unwrap();
    assert_eq!(
        backend.public_url("books", "kopi susu#pagi?.png"),
        format!(
            "{}/storage/v1/object/public/books/kopi%20susu%23pagi%3F.png",
            server.uri()
        )
    );
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let backend = RestBackend::new(&BackendConfig::new("http://127.0.0.1:9", "anon")).unwrap();
    let err = backend.select(&Query::table("books")).await.unwrap_err();
    assert!(err.is_transport());
}

#[test]
fn test_missing_config_is_not_configured() {
    let result = RestBackend::new(&BackendConfig::default());
    assert!(matches!(result, Err(BackendError::NotConfigured)));
}
