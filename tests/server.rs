//! HTTP API tests driven through the router without a socket.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use image::{ImageFormat, RgbImage};
use simple_shrink::config::AppConfig;
use simple_shrink::pipeline::Pipeline;
use simple_shrink::server::router;
use simple_shrink::storage::Storage;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----shrink-test-boundary";

fn app(root: &Path) -> axum::Router {
    let mut config = AppConfig::default();
    config.upscaler.script = Some(root.join("missing-inference.py").display().to_string());
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    router(Arc::new(Pipeline::from_config(
        &config,
        Storage::with_fixed_date(root, date),
    )))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 40])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn multipart(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn shrink_request(query: &str, body: Vec<u8>) -> Request<Body> {
    Request::post(format!("/shrink{query}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn shrink_returns_report_and_serves_artifact() {
    let tmp = TempDir::new().unwrap();
    let app = app(tmp.path());

    let response = app
        .clone()
        .oneshot(shrink_request(
            "?width=20&rotate=90",
            multipart("file", "tall.png", &png_bytes(40, 30)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    assert_eq!(body["relative_url"], "view_storage/2024-05-01/shrunk/tall.webp");
    assert_eq!(body["original_url"], "view_storage/2024-05-01/originals/tall.png");
    assert_eq!(body["width"], 20);
    assert_eq!(body["height"], 27);
    assert!(body["savings"].as_str().unwrap().ends_with("x smaller"));

    let served = app
        .oneshot(
            Request::get("/view_storage/2024-05-01/shrunk/tall.webp")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(served.status(), StatusCode::OK);
}

#[tokio::test]
async fn shrink_rejects_non_image_with_400() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(shrink_request(
            "?width=20",
            multipart("file", "junk.png", b"no pixels here"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(body["error"], "INVALID_IMAGE");
    assert!(body["detail"].is_string());
    assert!(!tmp.path().join("2024-05-01").exists());
}

#[tokio::test]
async fn shrink_without_file_part_is_400() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(shrink_request("", multipart("other", "a.png", &png_bytes(4, 4))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "NO_FILE");
}

#[tokio::test]
async fn shrink_with_unparseable_width_is_json_400() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(shrink_request(
            "?width=abc",
            multipart("file", "a.png", &png_bytes(4, 4)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(body["error"], "BAD_QUERY");
    assert!(body["detail"].as_str().unwrap().contains("width"));
    assert!(!tmp.path().join("2024-05-01").exists());
}

#[tokio::test]
async fn shrink_with_oversized_width_is_invalid_width() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(shrink_request(
            "?width=4000000000",
            multipart("file", "a.png", &png_bytes(4, 4)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "INVALID_WIDTH");
    assert!(!tmp.path().join("2024-05-01").exists());
}

#[tokio::test]
async fn shrink_without_multipart_body_is_json_400() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(
            Request::post("/shrink?width=20")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(Body::from(png_bytes(4, 4)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "BAD_MULTIPART");
}

#[tokio::test]
async fn upscale_without_file_key_is_json_400() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(Request::post("/upscale").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(json(response).await["error"], "BAD_QUERY");
}

#[tokio::test]
async fn upscale_unknown_key_is_404() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(
            Request::post("/upscale?file_key=missing.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response).await["error"], "NOT_FOUND");
}

#[tokio::test]
async fn upscale_after_shrink() {
    let tmp = TempDir::new().unwrap();
    let app = app(tmp.path());

    let shrunk = app
        .clone()
        .oneshot(shrink_request(
            "?width=10",
            multipart("file", "cat.png", &png_bytes(40, 30)),
        ))
        .await
        .unwrap();
    assert_eq!(shrunk.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::post("/upscale?file_key=cat.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    assert_eq!(body["original_url"], "view_storage/2024-05-01/originals/cat.png");
    assert_eq!(body["shrunk_url"], "view_storage/2024-05-01/shrunk/cat.webp");
    assert_eq!(
        body["upscaled_url"],
        "view_storage/2024-05-01/upscaled/upscaled_cat.png"
    );
    assert_eq!(body["orig_res"], "40x30");
    assert_eq!(body["shrunk_res"], "10x8");
    assert_eq!(body["up_res"], "40x30");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let tmp = TempDir::new().unwrap();

    let response = app(tmp.path())
        .oneshot(
            Request::post("/upscale?file_key=missing.jpg")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
