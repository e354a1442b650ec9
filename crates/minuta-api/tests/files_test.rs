//! Storage proxy tests: upload, download, list, delete.

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use helpers::*;
use http::header::AUTHORIZATION;
use http::HeaderValue;

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn audio_form(filename: &str, mime: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data)
            .file_name(filename.to_string())
            .mime_type(mime.to_string()),
    )
}

#[tokio::test]
async fn upload_stores_object_and_returns_signed_url() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .server
        .post(&api_path("/files"))
        .add_header(AUTHORIZATION, bearer(&token))
        .multipart(audio_form("standup.mp3", "audio/mpeg", vec![9u8; 2048]))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    let key = body["key"].as_str().unwrap();
    assert!(key.starts_with("uploads/"));
    assert!(key.ends_with(".mp3"));
    assert_eq!(body["original_name"], "standup.mp3");
    assert!(body["url"]
        .as_str()
        .unwrap()
        .starts_with("https://signed.example.com/"));
    assert!(app.storage.contains(key));
}

#[tokio::test]
async fn upload_with_disallowed_content_type_is_rejected() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .server
        .post(&api_path("/files"))
        .add_header(AUTHORIZATION, bearer(&token))
        .multipart(audio_form("movie.mp3", "video/mp4", vec![9u8; 2048]))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn upload_of_empty_file_is_rejected() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .server
        .post(&api_path("/files"))
        .add_header(AUTHORIZATION, bearer(&token))
        .multipart(audio_form("standup.mp3", "audio/mpeg", Vec::new()))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn download_serves_bytes_with_mapped_content_type() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    let uploaded: serde_json::Value = app
        .server
        .post(&api_path("/files"))
        .add_header(AUTHORIZATION, bearer(&token))
        .multipart(audio_form("standup.mp3", "audio/mpeg", vec![5u8; 128]))
        .await
        .json();
    let key = uploaded["key"].as_str().unwrap();

    let response = app
        .server
        .get(&api_path(&format!("/files/{}", key)))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );
    assert_eq!(response.as_bytes().len(), 128);
}

#[tokio::test]
async fn download_with_attachment_disposition() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    let uploaded: serde_json::Value = app
        .server
        .post(&api_path("/files"))
        .add_header(AUTHORIZATION, bearer(&token))
        .multipart(audio_form("standup.mp3", "audio/mpeg", vec![5u8; 16]))
        .await
        .json();
    let key = uploaded["key"].as_str().unwrap();

    let response = app
        .server
        .get(&api_path(&format!("/files/{}?download=true", key)))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();
    let disposition = response
        .headers()
        .get(http::header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
}

#[tokio::test]
async fn missing_file_is_404() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    let response = app
        .server
        .get(&api_path("/files/uploads/nope.mp3"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn list_returns_signed_urls_under_prefix() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    for name in ["a.mp3", "b.mp3"] {
        app.server
            .post(&api_path("/files"))
            .add_header(AUTHORIZATION, bearer(&token))
            .multipart(audio_form(name, "audio/mpeg", vec![1u8; 32]))
            .await
            .assert_status_success();
    }

    let response = app
        .server
        .get(&api_path("/files?prefix=uploads/"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f["url"]
        .as_str()
        .unwrap()
        .starts_with("https://signed.example.com/")));
}

#[tokio::test]
async fn delete_removes_object() {
    let app = setup_test_app().await;
    let (token, _) = login(&app).await;

    let uploaded: serde_json::Value = app
        .server
        .post(&api_path("/files"))
        .add_header(AUTHORIZATION, bearer(&token))
        .multipart(audio_form("standup.mp3", "audio/mpeg", vec![5u8; 16]))
        .await
        .json();
    let key = uploaded["key"].as_str().unwrap();

    let response = app
        .server
        .delete(&api_path(&format!("/files/{}", key)))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    assert!(!app.storage.contains(key));
}
