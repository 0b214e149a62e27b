use reelboard_backend::config::{AuthMode, ServerConfig, StaticToken};
use reelboard_backend::server::{spawn_server, RunningServer};
use serde_json::{json, Value};
use tempfile::TempDir;

fn static_token(token: &str, subject_id: &str) -> StaticToken {
    StaticToken {
        token: token.to_owned(),
        subject_id: subject_id.to_owned(),
        email: format!("{subject_id}@example.com"),
        name: None,
    }
}

async fn start(max_requests: usize) -> (RunningServer, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig {
        port: 0,
        data_dir: Some(dir.path().to_path_buf()),
        ..ServerConfig::default()
    };
    config.rate_limit.max_requests = max_requests;
    config.auth.mode = AuthMode::Static;
    config.auth.tokens = vec![static_token("tok-a", "user-a"), static_token("tok-b", "user-b")];

    let state = reelboard_backend::build_state(config).unwrap();
    let server = spawn_server(state).await.unwrap();
    (server, dir)
}

fn board_with_item(item_id: &str) -> Value {
    json!([
        {"id": "c1", "title": "Ideas", "color": "yellow", "items": [
            {"id": item_id, "title": "Hook idea", "description": "open on the product"}
        ]},
        {"id": "c2", "title": "Posted", "color": "green", "items": []}
    ])
}

#[tokio::test]
async fn health_needs_no_token() {
    let (server, _dir) = start(100).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/health", server.api_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn columns_require_a_valid_token() {
    let (server, _dir) = start(100).await;
    let client = reqwest::Client::new();
    let url = format!("{}/columns", server.api_url());

    let missing = client.get(&url).send().await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"], "No token provided");

    let wrong = client.get(&url).bearer_auth("nope").send().await.unwrap();
    assert_eq!(wrong.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn first_get_returns_default_columns() {
    let (server, _dir) = start(100).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/columns", server.api_url()))
        .bearer_auth("tok-a")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let titles: Vec<&str> = body["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Ideas", "Scripting", "Filming", "Posted"]);
}

#[tokio::test]
async fn put_replaces_columns_per_identity() {
    let (server, _dir) = start(100).await;
    let client = reqwest::Client::new();
    let url = format!("{}/columns", server.api_url());

    let resp = client
        .put(&url)
        .bearer_auth("tok-a")
        .json(&json!({ "columns": board_with_item("i1") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["columns"], board_with_item("i1"));

    let again: Value = client
        .get(&url)
        .bearer_auth("tok-a")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["columns"], board_with_item("i1"));

    let other: Value = client
        .get(&url)
        .bearer_auth("tok-b")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(other["columns"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn put_rejects_invalid_shapes() {
    let (server, _dir) = start(100).await;
    let client = reqwest::Client::new();
    let url = format!("{}/columns", server.api_url());

    for columns in [
        json!("not an array"),
        json!([{"id": "c1", "title": "Ideas", "items": []}]),
        json!([{"id": "c1", "title": "Ideas", "color": "yellow", "items": [{"title": "no id"}]}]),
        json!([{"id": "c1", "title": "Ideas", "color": "yellow"}]),
    ] {
        let resp = client
            .put(&url)
            .bearer_auth("tok-a")
            .json(&json!({ "columns": columns }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "{columns}");
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
        assert!(body["details"].is_string());
    }

    let malformed = client
        .put(&url)
        .bearer_auth("tok-a")
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{oops")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);

    // Nothing above reached the store.
    let stored: Value = client
        .get(&url)
        .bearer_auth("tok-a")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["columns"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn migrate_into_empty_board_then_conflict() {
    let (server, _dir) = start(100).await;
    let client = reqwest::Client::new();
    let migrate_url = format!("{}/columns/migrate", server.api_url());

    let resp = client
        .post(&migrate_url)
        .bearer_auth("tok-a")
        .json(&json!({ "columns": board_with_item("i1") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["columns"], board_with_item("i1"));

    let conflict = client
        .post(&migrate_url)
        .bearer_auth("tok-a")
        .json(&json!({ "columns": board_with_item("i2") }))
        .send()
        .await
        .unwrap();
    assert_eq!(conflict.status(), reqwest::StatusCode::CONFLICT);
    let body: Value = conflict.json().await.unwrap();
    assert_eq!(
        body["error"],
        "User already has data. Migration aborted to prevent data loss."
    );

    let stored: Value = client
        .get(format!("{}/columns", server.api_url()))
        .bearer_auth("tok-a")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["columns"], board_with_item("i1"));
}

#[tokio::test]
async fn migrate_rejects_invalid_shape() {
    let (server, _dir) = start(100).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/columns/migrate", server.api_url()))
        .bearer_auth("tok-a")
        .json(&json!({ "columns": [{"id": "c1"}] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid column structure for migration");
}

#[tokio::test]
async fn rate_limit_answers_429() {
    let (server, _dir) = start(2).await;
    let client = reqwest::Client::new();
    let url = format!("{}/health", server.api_url());

    for remaining in ["1", "0"] {
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.headers()["ratelimit-limit"], "2");
        assert_eq!(resp.headers()["ratelimit-remaining"], remaining);
    }

    let limited = client.get(&url).send().await.unwrap();
    assert_eq!(limited.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));
    let body: Value = limited.json().await.unwrap();
    assert_eq!(body["error"], "Too many requests, please try again later");

    server.shutdown().await;
}
