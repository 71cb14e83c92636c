//! Common test utilities for API integration tests
//!
//! Builds the router over an isolated in-memory database and drives it
//! with `oneshot` requests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use taskhub_api::{DbState, create_router};
use taskhub_db::Database;
use tower::ServiceExt;

/// Router plus a handle on its database for direct inspection
pub struct TestApp {
    pub router: Router,
    pub db: DbState,
}

/// Create a router backed by a fresh in-memory database
pub async fn setup_test_app() -> TestApp {
    let db = Database::in_memory().await.unwrap();
    db.init().await.unwrap();
    let db = Arc::new(db);

    TestApp {
        router: create_router(db.clone()),
        db,
    }
}

impl TestApp {
    /// Send a request with an optional JSON body
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    /// Send a form-encoded body
    #[allow(dead_code)]
    pub async fn send_form(&self, method: Method, uri: &str, form: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.dispatch(request).await
    }

    /// Send a raw body with the given content type
    #[allow(dead_code)]
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        content_type: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Insert a user directly and return its key
    #[allow(dead_code)]
    pub async fn create_user(&self, name: &str) -> String {
        self.db.users().create(name, "").await.unwrap().id
    }

    /// Current pending task keys of a user
    #[allow(dead_code)]
    pub async fn pending_tasks(&self, user_id: &str) -> Vec<String> {
        self.db
            .users()
            .get(user_id)
            .await
            .unwrap()
            .unwrap()
            .pending_tasks
    }
}
