use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use qg_api::{config::Environment, router, state::ApiState};
use qg_core::{
    GenerationError, GenerationRequest, MemoryStore, ProgressStore, QuizData, QuizGenerator,
    testing::{StaticGenerator, sample_quiz},
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;
use uuid::Uuid;

/// Test state builder for creating an ApiState with in-process collaborators
pub struct TestStateBuilder {
    store: Arc<dyn ProgressStore>,
    generator: Arc<dyn QuizGenerator>,
}

impl TestStateBuilder {
    /// Memory store and a generator answering with a three-question quiz
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            generator: Arc::new(StaticGenerator::with_quiz(sample_quiz(3))),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn QuizGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn build(self) -> ApiState {
        ApiState::with_parts(self.store, self.generator, Environment::Development)
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Router over a fresh default state
pub fn test_app() -> TestClient {
    TestClient::new(router::router().with_state(TestStateBuilder::new().build()))
}

/// Generator that waits for the test to open the gate before answering
#[derive(Debug, Default)]
pub struct GatedGenerator {
    pub started: Notify,
    pub gate: Notify,
}

impl GatedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl QuizGenerator for GatedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<QuizData, GenerationError> {
        self.started.notify_one();
        self.gate.notified().await;
        Ok(sample_quiz(2))
    }
}

/// Helper to make requests to the test app
#[derive(Clone)]
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request and get the response
    pub async fn request(&self, mut request: Request<Body>) -> TestResponse {
        // Add ConnectInfo extension for rate limiting to work in tests
        use axum::extract::ConnectInfo;
        use std::net::{IpAddr, Ipv4Addr, SocketAddr};

        let test_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);
        request.extensions_mut().insert(ConnectInfo(test_addr));

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<&Value>) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "127.0.0.1"); // Required for rate limiting in tests

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(body).expect("Failed to serialize body"),
                )),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.request(request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send("GET", uri, None).await
    }

    /// Send a POST request with no body
    pub async fn post(&self, uri: &str) -> TestResponse {
        self.send("POST", uri, None).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn patch_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send("PATCH", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send("DELETE", uri, None).await
    }

    /// Open a new session, returning its id and first view
    pub async fn create_session(&self) -> (Uuid, Value) {
        let response = self.post("/sessions").await;
        response.assert_status(StatusCode::CREATED);
        let view: Value = response.json();
        let id = view["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .expect("Session id should be a UUID");
        (id, view)
    }

    /// Open a session and generate its quiz
    pub async fn active_session(&self) -> (Uuid, Value) {
        let (id, _) = self.create_session().await;
        let response = self.post(&format!("/sessions/{id}/generate")).await;
        response.assert_status(StatusCode::OK);
        let view: Value = response.json();
        assert_eq!(view["phase"], "active", "generation should succeed: {view}");
        (id, view)
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: axum::http::HeaderMap,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Parse response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}
