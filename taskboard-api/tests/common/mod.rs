//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An app backed by the in-memory store
//! - User registration through the HTTP surface
//! - JSON request helpers

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::password::HashParams;
use taskboard_shared::store::InMemoryStore;
use tower::Service;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing the router
pub struct TestContext {
    pub app: Router,
}

/// A user registered through `/v1/auth/registration`
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
}

impl TestUser {
    pub fn id_str(&self) -> String {
        self.id.to_string()
    }
}

impl TestContext {
    /// Creates a fresh app over an empty in-memory store
    pub fn new() -> Self {
        let state = AppState::new(
            Arc::new(InMemoryStore::new()),
            Config::in_memory(TEST_JWT_SECRET),
            HashParams::insecure_fast(),
        );

        Self {
            app: build_router(state),
        }
    }

    /// Sends a request and returns the status and parsed JSON body
    ///
    /// Empty bodies are returned as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Registers a user named `name` with email `<name>@example.com`
    pub async fn register(&self, name: &str) -> TestUser {
        let email = format!("{}@example.com", name.to_lowercase());
        let (status, body) = self
            .request(
                Method::POST,
                "/v1/auth/registration",
                None,
                Some(serde_json::json!({
                    "fullname": name,
                    "email": email,
                    "password": "correct-horse",
                    "repeated_password": "correct-horse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");

        TestUser {
            id: body["user_id"].as_str().unwrap().parse().unwrap(),
            email,
            token: body["token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a board owned by `owner` and returns its ID
    pub async fn create_board(&self, owner: &TestUser, title: &str, members: &[&TestUser]) -> String {
        let members: Vec<String> = members.iter().map(|m| m.id_str()).collect();
        let (status, body) = self
            .post(
                "/v1/boards",
                owner,
                serde_json::json!({ "title": title, "members": members }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "board creation failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Creates a task on `board_id` as `user` and returns its ID
    pub async fn create_task(&self, user: &TestUser, board_id: &str, extra: Value) -> String {
        let mut body = serde_json::json!({ "board": board_id, "title": "Task" });
        if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }

        let (status, body) = self.post("/v1/tasks", user, body).await;
        assert_eq!(status, StatusCode::CREATED, "task creation failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}

/// Field names carried by a `validation_error` response
pub fn error_fields(body: &Value) -> Vec<String> {
    assert_eq!(body["error"], "validation_error", "unexpected body: {body}");
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
