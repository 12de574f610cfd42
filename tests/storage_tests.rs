use bytes::Bytes;
use cvdesk_client::error::Error;
use cvdesk_client::storage::{FileOptions, ListOptions};
use cvdesk_client::Backend;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn upload_sends_the_anon_key_when_signed_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/resumes/docs/cv.pdf"))
        .and(header("apikey", "test-anon-key"))
        .and(header("Authorization", "Bearer test-anon-key"))
        .and(header("x-upsert", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Key": "resumes/docs/cv.pdf"
        })))
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let options = FileOptions {
        content_type: Some("application/pdf".to_string()),
        upsert: true,
        ..Default::default()
    };

    let response = backend
        .storage()
        .from("resumes")
        .upload("docs/cv.pdf", Bytes::from_static(b"%PDF-1.4"), options)
        .await
        .unwrap();
    assert_eq!(response.key.as_deref(), Some("resumes/docs/cv.pdf"));
}

#[tokio::test]
async fn upload_file_reads_from_disk() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/resumes/docs/cv.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Key": "resumes/docs/cv.pdf"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("cv.pdf");
    std::fs::write(&file_path, b"%PDF-1.4").unwrap();

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let response = backend
        .storage()
        .from("resumes")
        .upload_file("docs/cv.pdf", &file_path, FileOptions::default())
        .await
        .unwrap();
    assert_eq!(response.key.as_deref(), Some("resumes/docs/cv.pdf"));
}

#[tokio::test]
async fn upload_file_reports_a_missing_file() {
    let server = MockServer::start().await;
    let backend = Backend::new(&server.uri(), "test-anon-key");

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.pdf");

    let error = backend
        .storage()
        .from("resumes")
        .upload_file("docs/nope.pdf", &missing, FileOptions::default())
        .await
        .unwrap_err();
    match error {
        Error::Storage(message) => assert!(message.contains("Failed to read")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn list_posts_the_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/list/resumes"))
        .and(body_partial_json(json!({"prefix": "docs"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "cv.pdf", "id": null, "bucket_id": "resumes"},
            {"name": "cover-letter.pdf"}
        ])))
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let objects = backend
        .storage()
        .from("resumes")
        .list("docs", ListOptions::default())
        .await
        .unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].name, "cv.pdf");
}

#[tokio::test]
async fn signed_urls_come_back_absolute() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/sign/resumes/docs/cv.pdf"))
        .and(body_partial_json(json!({"expiresIn": 60})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signedURL": "/object/sign/resumes/docs/cv.pdf?token=abc123"
        })))
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let url = backend
        .storage()
        .from("resumes")
        .create_signed_url("docs/cv.pdf", 60)
        .await
        .unwrap();
    assert_eq!(
        url,
        format!(
            "{}/storage/v1/object/sign/resumes/docs/cv.pdf?token=abc123",
            server.uri()
        )
    );
}

#[test]
fn public_urls_need_no_request() {
    let backend = Backend::new("https://project.example.com", "test-anon-key");
    let url = backend
        .storage()
        .from("resumes")
        .get_public_url("docs/cv.pdf");
    assert_eq!(
        url,
        "https://project.example.com/storage/v1/object/public/resumes/docs/cv.pdf"
    );
}

#[tokio::test]
async fn download_reports_a_missing_object() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/storage/v1/object/resumes/docs/nope.pdf"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "statusCode": "404",
            "error": "not_found",
            "message": "Object not found"
        })))
        .mount(&server)
        .await;

    let backend = Backend::new(&server.uri(), "test-anon-key");
    let error = backend
        .storage()
        .from("resumes")
        .download("docs/nope.pdf")
        .await
        .unwrap_err();
    match error {
        Error::Storage(message) => {
            assert!(message.contains("404"));
            assert!(message.contains("Object not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
