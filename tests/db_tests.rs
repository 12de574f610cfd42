use cvdesk_client::error::Error;
use cvdesk_client::Backend;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, headers, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn select_sends_postgrest_filters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/documents"))
        .and(query_param("select", "id,name"))
        .and(query_param("status", "eq.active"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "2"))
        .and(header("apikey", "test-anon-key"))
        .and(header("Authorization", "Bearer test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name": "second"},
            {"id": 1, "name": "first"}
        ])))
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let rows: Vec<serde_json::Value> = backend
        .from("documents")
        .select("id,name")
        .eq("status", "active")
        .order("created_at", false)
        .limit(2)
        .execute()
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "second");
}

#[tokio::test]
async fn execute_one_reports_a_missing_row_as_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/documents"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let row = backend
        .from("documents")
        .select("*")
        .eq("id", 42)
        .execute_one::<serde_json::Value>()
        .await
        .unwrap();

    assert!(row.is_none());
}

#[tokio::test]
async fn insert_can_skip_the_representation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/documents"))
        .and(header("Prefer", "return=minimal"))
        .and(body_partial_json(json!({"name": "draft"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    backend
        .from("documents")
        .insert(json!({"name": "draft"}))
        .execute_no_return()
        .await
        .unwrap();
}

#[tokio::test]
async fn upsert_can_skip_the_representation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/documents"))
        .and(query_param("on_conflict", "id"))
        .and(headers("Prefer", vec!["resolution=merge-duplicates", "return=minimal"]))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    backend
        .from("documents")
        .insert(json!({"id": 7, "name": "draft"}))
        .on_conflict("id")
        .execute_no_return()
        .await
        .unwrap();
}

#[tokio::test]
async fn update_applies_the_filter_without_a_body() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/documents"))
        .and(query_param("id", "eq.7"))
        .and(header("Prefer", "return=minimal"))
        .and(body_partial_json(json!({"name": "renamed"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    backend
        .from("documents")
        .update(json!({"name": "renamed"}))
        .eq("id", 7)
        .execute_no_return()
        .await
        .unwrap();
}

#[tokio::test]
async fn database_errors_carry_the_structured_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/documents"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "42501",
            "message": "permission denied for table documents",
            "details": null,
            "hint": "enable row level security"
        })))
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let error = backend
        .from("documents")
        .select("*")
        .execute::<serde_json::Value>()
        .await
        .unwrap_err();

    match error {
        Error::Database {
            status,
            code,
            message,
            hint,
            ..
        } => {
            assert_eq!(status, 401);
            assert_eq!(code.as_deref(), Some("42501"));
            assert_eq!(message, "permission denied for table documents");
            assert_eq!(hint.as_deref(), Some("enable row level security"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
