//! Status codes and bodies of the `/specs` routes.

use std::sync::Arc;

use augur_config::NodeConfig;
use augur_engine::JobEngine;
use augur_store::{Bridge, SqliteStore, Store};
use augur_task::{HttpClient, HttpSettings};
use augur_web::router;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

async fn new_app(config: NodeConfig) -> Router {
  let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
  store
    .create_bridge(&Bridge::new(
      "coingecko",
      Url::parse("http://adapter.example/price").unwrap(),
      Utc::now(),
    ))
    .await
    .unwrap();
  let http = HttpClient::new(HttpSettings::from(&config)).unwrap();
  router(Arc::new(JobEngine::new(Arc::new(store), Arc::new(config), http)))
}

async fn send(app: &Router, method: Method, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
  let request = Request::builder()
    .method(method)
    .uri(uri)
    .body(body.into())
    .unwrap();
  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, body)
}

fn web_job() -> String {
  json!({
    "initiators": [{"type": "web"}],
    "tasks": [{"type": "bridge", "name": "coingecko"}, {"type": "multiply", "times": 100}]
  })
  .to_string()
}

fn detail(body: &Value) -> &str {
  body["errors"][0]["detail"].as_str().unwrap()
}

#[tokio::test]
async fn test_create_show_archive() {
  let app = new_app(NodeConfig::default()).await;

  let (status, body) = send(&app, Method::POST, "/specs", web_job()).await;
  assert_eq!(status, StatusCode::OK);
  let id = body["data"]["id"].as_str().unwrap().to_string();

  let (status, body) = send(&app, Method::GET, &format!("/specs/{}", id), Body::empty()).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["id"], id.as_str());

  let (status, _) = send(&app, Method::DELETE, &format!("/specs/{}", id), Body::empty()).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = send(&app, Method::GET, &format!("/specs/{}", id), Body::empty()).await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["data"]["archivedAt"].is_string());

  let (status, _) = send(&app, Method::DELETE, &format!("/specs/{}", id), Body::empty()).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_errors() {
  let app = new_app(NodeConfig::default()).await;

  let (status, body) = send(&app, Method::POST, "/specs", "{not json").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(detail(&body).contains("malformed"));

  let invalid = json!({"initiators": [{"type": "web"}], "tasks": [{"type": "bridge", "name": "nobody"}]});
  let (status, body) = send(&app, Method::POST, "/specs", invalid.to_string()).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(detail(&body).contains("nobody"));

  let flux = json!({
    "initiators": [{"type": "fluxmonitor", "params": {"address": "0x01", "feeds": ["https://a.example"]}}],
    "tasks": [{"type": "bridge", "name": "coingecko"}]
  });
  let (status, body) = send(&app, Method::POST, "/specs", flux.to_string()).await;
  assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
  assert_eq!(detail(&body), "The Flux Monitor feature is disabled by configuration");
}

#[tokio::test]
async fn test_bad_and_unknown_ids() {
  let app = new_app(NodeConfig::default()).await;

  let (status, _) = send(&app, Method::GET, "/specs/not-a-uuid", Body::empty()).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let unknown = "/specs/6bb2b7e2f1f74c8a8c1fb1d3c9e6a7b0";
  let (status, body) = send(&app, Method::GET, unknown, Body::empty()).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(detail(&body).contains("not found"));

  let (status, _) = send(&app, Method::DELETE, "/specs/v2/abc", Body::empty()).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  let (status, _) = send(&app, Method::DELETE, "/specs/v2/42", Body::empty()).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_v2_create_and_delete() {
  let spec = r#"
    type = "offchainreporting"
    schemaVersion = 1
    contractAddress = "0x613a38AC1659769640aaE063C651F48E0250454C"

    [[observationSource]]
    type = "bridge"
    name = "coingecko"
  "#;

  let app = new_app(NodeConfig::default()).await;
  let (status, body) = send(&app, Method::POST, "/specs/v2", spec).await;
  assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
  assert_eq!(detail(&body), "The Offchain Reporting feature is disabled by configuration");

  let app = new_app(NodeConfig {
    feature_offchain_reporting: true,
    ..NodeConfig::default()
  })
  .await;
  let (status, body) = send(&app, Method::POST, "/specs/v2", spec).await;
  assert_eq!(status, StatusCode::OK);
  let id = body["jobID"].as_i64().unwrap();

  let (status, _) = send(&app, Method::DELETE, &format!("/specs/v2/{}", id), Body::empty()).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&app, Method::DELETE, &format!("/specs/v2/{}", id), Body::empty()).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(&app, Method::POST, "/specs/v2", "type = ").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_pages() {
  let app = new_app(NodeConfig::default()).await;
  for _ in 0..3 {
    let (status, _) = send(&app, Method::POST, "/specs", web_job()).await;
    assert_eq!(status, StatusCode::OK);
  }

  let (status, body) = send(&app, Method::GET, "/specs?page=1&size=2", Body::empty()).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"].as_array().unwrap().len(), 2);
  assert_eq!(body["meta"]["count"], 3);
  assert_eq!(body["links"]["next"], "/specs?page=2&size=2&sort=createdAt");

  let (_, descending) = send(&app, Method::GET, "/specs?sort=-createdAt", Body::empty()).await;
  let (_, ascending) = send(&app, Method::GET, "/specs", Body::empty()).await;
  assert_eq!(descending["data"][0]["id"], ascending["data"][2]["id"]);

  let (status, by_name) = send(&app, Method::GET, "/specs?sort=name", Body::empty()).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(by_name["data"], ascending["data"]);

  let (status, _) = send(&app, Method::GET, "/specs?page=0", Body::empty()).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_unregistered_external_initiator_is_server_error() {
  let app = new_app(NodeConfig::default()).await;
  let job = json!({
    "initiators": [{"type": "external", "params": {"name": "keeper"}}],
    "tasks": [{"type": "bridge", "name": "coingecko"}]
  });

  let (status, body) = send(&app, Method::POST, "/specs", job.to_string()).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(detail(&body).contains("keeper"));

  let (_, listed) = send(&app, Method::GET, "/specs", Body::empty()).await;
  assert_eq!(listed["meta"]["count"], 0);
}
