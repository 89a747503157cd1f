#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use care_chronicle::config::LimitsConfig;
use care_chronicle::daemon::{build_router, AppState};
use care_chronicle::store::CareStore;

pub struct TestApp {
    pub app: Router,
    pub store: Arc<CareStore>,
    _db: NamedTempFile,
}

pub async fn open_store() -> (CareStore, NamedTempFile) {
    let db = NamedTempFile::new().unwrap();
    let store = CareStore::open_path(db.path().to_str().unwrap())
        .await
        .unwrap();
    (store, db)
}

pub async fn test_app() -> TestApp {
    let (store, db) = open_store().await;
    let store = Arc::new(store);
    let app = build_router(AppState::new(store.clone(), LimitsConfig::default()));
    TestApp {
        app,
        store,
        _db: db,
    }
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, None).await
    }

    /// Creates a member and returns its id.
    pub async fn member(&self, body: Value) -> String {
        let (status, value) = self.post("/api/members", body).await;
        assert_eq!(status, StatusCode::OK, "{value}");
        value["data"]["id"].as_str().unwrap().to_string()
    }
}
