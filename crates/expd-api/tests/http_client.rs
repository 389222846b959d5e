//! Integration tests for `HttpApiClient` against a local stand-in server.

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use expd_api::{ApiClient, ApiConfig, ApiError, HttpApiClient, PublishArgs};
use serde_json::{json, Value};

async fn spawn_backend() -> String {
    let app = Router::new()
        .route(
            "/--/api/whoami/{args}",
            get(|headers: HeaderMap| async move {
                match headers.get("exp-session").and_then(|v| v.to_str().ok()) {
                    Some("secret") => Json(json!({ "user": { "username": "ada" } })),
                    _ => Json(json!({ "user": null })),
                }
            }),
        )
        .route(
            "/--/api/signManifest/{args}",
            post(|Path(args): Path<String>, Json(body): Json<Value>| async move {
                let args: Value = serde_json::from_str(&args).unwrap();
                let signed = format!(
                    "signed:{}:{}",
                    args[0]["remoteFullPackageName"].as_str().unwrap_or_default(),
                    body["name"].as_str().unwrap_or_default()
                );
                Json(json!({ "response": signed }))
            }),
        )
        .route(
            "/--/api/fails/{args}",
            get(|| async { Json(json!({ "err": "Something broke", "code": "BROKEN" })) }),
        )
        .route(
            "/--/sdk-versions",
            get(|| async {
                Json(json!({ "5.0.0": { "exponent-react-native-tag": "sdk-5.0.0" } }))
            }),
        )
        .route("/--/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn client(base_url: String, session: Option<&str>) -> HttpApiClient {
    HttpApiClient::new(ApiConfig {
        base_url,
        session: session.map(str::to_string),
        ..ApiConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_whoami_with_and_without_session() {
    let base = spawn_backend().await;

    let anonymous = client(base.clone(), None);
    assert_eq!(anonymous.whoami().await.unwrap(), None);

    let logged_in = client(base, Some("secret"));
    let user = logged_in.whoami().await.unwrap().unwrap();
    assert_eq!(user.username, "ada");
}

#[tokio::test]
async fn test_sign_manifest_round_trip() {
    let base = spawn_backend().await;
    let client = client(base, Some("secret"));

    let args = PublishArgs::new("ada", "my-app", "1.0.0", "exp://ada.exp.direct", "5.0.0");
    let signed = client
        .sign_manifest(&args, &json!({ "name": "My App" }))
        .await
        .unwrap();

    assert_eq!(signed, "signed:@ada/my-app:My App");
}

#[tokio::test]
async fn test_sdk_versions_table() {
    let base = spawn_backend().await;
    let table = client(base, None).sdk_versions().await.unwrap();

    assert_eq!(
        table["5.0.0"].react_native_tag.as_deref(),
        Some("sdk-5.0.0")
    );
}

#[tokio::test]
async fn test_remote_err_payload_becomes_error() {
    let base = spawn_backend().await;
    let err = client(base, None)
        .call_method("fails", json!([]), expd_api::HttpMethod::Get, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Remote { .. }));
    assert_eq!(err.code(), Some("BROKEN"));
}

#[tokio::test]
async fn test_http_status_error() {
    let base = spawn_backend().await;
    let err = client(base, None).call_path("/--/down").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{}", addr), None)
        .sdk_versions()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }));
}
