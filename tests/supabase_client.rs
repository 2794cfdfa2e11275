//! Hosted Backend Tests
//!
//! Exercises the Supabase-compatible client against a mock server.

use std::sync::Arc;

use bytes::Bytes;
use fileshare::backend::{MetadataStore, NewFileRecord, ObjectStore, SupabaseClient, UploadOptions};
use fileshare::config::SupabaseConfig;
use fileshare::share::UploadedFile;
use fileshare::{Backend, ShareError, UploadService};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-anon-key";

fn client(server: &MockServer) -> SupabaseClient {
    let config = SupabaseConfig {
        url: server.uri(),
        key: KEY.to_string(),
        timeout_secs: 5,
    };
    SupabaseClient::new(&config, "files", "files").unwrap()
}

fn row(download_id: &str) -> serde_json::Value {
    json!({
        "id": 42,
        "download_id": download_id,
        "filename": "report.pdf",
        "filesize": 5242880,
        "file_path": format!("{download_id}/{download_id}.pdf"),
        "file_type": "application/pdf",
        "download_url": format!("https://x/storage/v1/object/public/files/{download_id}/{download_id}.pdf"),
        "created_at": "2024-03-01T10:00:00.123456+00:00",
        "updated_at": null
    })
}

#[tokio::test]
async fn test_list_buckets_sends_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/bucket"))
        .and(header("apikey", KEY))
        .and(header("authorization", format!("Bearer {KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "files", "name": "files", "public": true},
            {"id": "avatars", "name": "avatars", "public": false}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let buckets = client(&server).list_buckets().await.unwrap();
    assert_eq!(buckets, vec!["files".to_string(), "avatars".to_string()]);
}

#[tokio::test]
async fn test_upload_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/files/abc/abc.pdf"))
        .and(header("content-type", "application/pdf"))
        .and(header("cache-control", "max-age=3600"))
        .and(header("x-upsert", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "files/abc/abc.pdf"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .upload(
            "abc/abc.pdf",
            Bytes::from_static(b"%PDF-1.7"),
            &UploadOptions::new("application/pdf"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_error_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/files/abc/abc.pdf"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bucket not found"))
        .mount(&server)
        .await;

    let err = client(&server)
        .upload("abc/abc.pdf", Bytes::new(), &UploadOptions::new("application/pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, ShareError::Storage(_)));
    assert!(err.to_string().contains("Bucket not found"));
}

#[tokio::test]
async fn test_remove_missing_object_is_ok() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/files/gone/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).remove("gone/gone.pdf").await.unwrap();
}

#[tokio::test]
async fn test_insert_returns_representation() {
    let server = MockServer::start().await;
    let record = NewFileRecord {
        download_id: "abc".to_string(),
        filename: "report.pdf".to_string(),
        filesize: 5242880,
        file_path: "abc/abc.pdf".to_string(),
        file_type: "application/pdf".to_string(),
        download_url: "https://x/storage/v1/object/public/files/abc/abc.pdf".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/rest/v1/files"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!([record])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row("abc")])))
        .expect(1)
        .mount(&server)
        .await;

    let stored = client(&server).insert(&record).await.unwrap();
    assert_eq!(stored.id, "42");
    assert_eq!(stored.download_id, "abc");
    assert_eq!(stored.size(), 5242880);
}

#[tokio::test]
async fn test_insert_failure_is_database_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/files"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "permission denied"})),
        )
        .mount(&server)
        .await;

    let record = NewFileRecord {
        download_id: "abc".to_string(),
        filename: "report.pdf".to_string(),
        filesize: 1,
        file_path: "abc/abc.pdf".to_string(),
        file_type: "application/pdf".to_string(),
        download_url: String::new(),
    };
    let err = client(&server).insert(&record).await.unwrap_err();

    assert!(matches!(err, ShareError::Database(_)));
    assert!(err.to_string().contains("permission denied"));
}

#[tokio::test]
async fn test_find_by_download_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/files"))
        .and(query_param("select", "*"))
        .and(query_param("download_id", "eq.abc"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("abc")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/files"))
        .and(query_param("download_id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client(&server);
    let found = client.find_by_download_id("abc").await.unwrap().unwrap();
    assert_eq!(found.filename, "report.pdf");

    assert!(client.find_by_download_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_row() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/files"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("abc")])))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).delete("42").await.unwrap());
}

#[tokio::test]
async fn test_publish_through_hosted_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex_object())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "x"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/files"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row("returned-id")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(client(&server));
    let backend = Backend::new(client.clone(), client);
    let service = UploadService::new(backend, 100 * 1024 * 1024, false);

    let published = service
        .publish(
            UploadedFile {
                filename: "report.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                data: Bytes::from(vec![0u8; 1024]),
            },
            "https://share.example.com",
        )
        .await
        .unwrap();

    // The link uses the ID from the stored row
    assert_eq!(
        published.share_url,
        "https://share.example.com/download/returned-id"
    );
}

#[tokio::test]
async fn test_publish_storage_failure_skips_insert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex_object())
        .respond_with(ResponseTemplate::new(500).set_body_string("storage down"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/files"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row("x")])))
        .expect(0)
        .mount(&server)
        .await;

    let client = Arc::new(client(&server));
    let service = UploadService::new(Backend::new(client.clone(), client), 1024 * 1024, false);

    let err = service
        .publish(
            UploadedFile {
                filename: "report.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                data: Bytes::from_static(b"data"),
            },
            "https://share.example.com",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ShareError::Storage(_)));
}

fn path_regex_object() -> wiremock::matchers::PathRegexMatcher {
    wiremock::matchers::path_regex(r"^/storage/v1/object/files/[0-9a-f-]+/[0-9a-f-]+\.pdf$")
}
