use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde_json::{Value, json};
use subak_session::{ApiClient, ApiRequest, Config, FormPayload, RecordingNavigator};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn file_backed_config(server: &MockServer, dir: &std::path::Path) -> Config {
    Config::from_values(server.uri(), Some(5), Some(dir.to_path_buf()))
}

#[tokio::test]
async fn json_requests_carry_bearer_and_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/lockers/swap"))
        .and(header("Authorization", "Bearer abc"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({ "from": 1, "to": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = ApiClient::new(file_backed_config(&server, dir.path())).unwrap();
    client.tokens().set(Some("abc".into()));

    let req = ApiRequest::post("/v4/lockers/swap")
        .json(&json!({ "from": 1, "to": 2 }))
        .unwrap();
    let res: Value = client.send_json(req).await.unwrap();
    assert_eq!(res["ok"], true);
}

#[tokio::test]
async fn multipart_uploads_keep_transport_boundary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/admin/notices"))
        .respond_with(|req: &Request| {
            let content_type = req
                .headers
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default();
            if content_type.starts_with("multipart/form-data; boundary=") {
                ResponseTemplate::new(201)
            } else {
                ResponseTemplate::new(415)
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(Config::from_values(server.uri(), Some(5), None)).unwrap();
    client.tokens().set(Some("admin".into()));
    let form = FormPayload::new()
        .text("title", "Maintenance")
        .file("image", "map.png", Some("image/png"), vec![0x89, 0x50, 0x4e, 0x47]);
    let res = client
        .execute(ApiRequest::post("/v4/admin/notices").form(form))
        .await
        .expect("multipart accepted");
    assert_eq!(res.status().as_u16(), 201);
}

#[tokio::test]
async fn multipart_is_rebuilt_for_replay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/reports"))
        .and(header("Authorization", "Bearer new"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/reports"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/auth/reissue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "new" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(Config::from_values(server.uri(), Some(5), None)).unwrap();
    client.tokens().set(Some("old".into()));
    let form = FormPayload::new().file("photo", "lock.jpg", Some("image/jpeg"), vec![1, 2, 3]);
    let res = client
        .execute(ApiRequest::post("/v4/reports").form(form))
        .await
        .expect("replayed upload accepted");
    assert_eq!(res.status().as_u16(), 201);
}

#[tokio::test]
async fn explicit_authorization_is_not_overwritten() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/admin/coins"))
        .and(header("Authorization", "Bearer override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 10 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(Config::from_values(server.uri(), Some(5), None)).unwrap();
    client.tokens().set(Some("stored".into()));
    let req = ApiRequest::get("/v4/admin/coins")
        .header(AUTHORIZATION, HeaderValue::from_static("Bearer override"));
    let res: Value = client.send_json(req).await.unwrap();
    assert_eq!(res["total"], 10);
}

#[tokio::test]
async fn reissued_token_is_persisted_to_storage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/lockers"))
        .and(header("Authorization", "Bearer persisted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/lockers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v4/auth/reissue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "persisted" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = ApiClient::new(file_backed_config(&server, dir.path())).unwrap();
    let _: Value = client.get_json("/v4/lockers").await.unwrap();
    drop(client);

    let on_disk = std::fs::read_to_string(dir.path().join("subak_access_token")).unwrap();
    assert_eq!(on_disk, "persisted");

    // a new client picks the token up at startup
    let restarted = ApiClient::new(file_backed_config(&server, dir.path())).unwrap();
    assert_eq!(restarted.tokens().get().as_deref(), Some("persisted"));
}

#[tokio::test]
async fn bootstrap_consumes_token_from_landing_url() {
    let server = MockServer::start().await;
    let navigator = Arc::new(RecordingNavigator::new());
    let client = ApiClient::with_navigator(
        Config::from_values(server.uri(), Some(5), None),
        navigator.clone(),
    )
    .unwrap();

    let cleaned = client.bootstrap("https://app/?token=xyz&foo=1").unwrap();

    assert_eq!(client.tokens().get().as_deref(), Some("xyz"));
    assert_eq!(cleaned.as_str(), "https://app/?foo=1");
    assert_eq!(navigator.replaced(), vec![cleaned]);
}
