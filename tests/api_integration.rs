//! Integration tests for the REST API.
//!
//! Each test opens an on-disk database in a temp dir, spins up the real
//! router on a random port with a stub LLM behind the real generator, and
//! talks to it over HTTP with reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Months, Utc};
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::timeout;

use nudge::api::{AppState, router};
use nudge::auth::StaticTokenVerifier;
use nudge::error::LlmError;
use nudge::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use nudge::reminders::dedup::SubstringMatcher;
use nudge::reminders::{Category, GeneratorConfig, LlmReminderGenerator};
use nudge::store::{Database, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const TOKEN: &str = "test-token";

/// Stub LLM provider (no real API calls). Answers quick-add prompts with a
/// single object and everything else with a fenced reminder array.
struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let today = Utc::now().date_naive();
        let content = if request.prompt.starts_with("Parse this reminder") {
            json!({
                "category": "home",
                "title": "Call the plumber",
                "description": null,
                "recurring": false
            })
            .to_string()
        } else {
            format!(
                "```json\n{}\n```",
                json!([
                    {
                        "category": "car",
                        "title": "Oil change",
                        "description": "Keep the engine happy.",
                        "due_date": today.to_string(),
                        "recurring": true,
                        "recurrence_label": "Every 6 months",
                        "recurrence_interval": "6_months"
                    },
                    {
                        "category": "garden",
                        "title": "Water the lawn",
                        "due_date": today.to_string(),
                        "recurring": false
                    }
                ])
            )
        };
        Ok(CompletionResponse { content })
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    db: Arc<LibSqlBackend>,
    _dir: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut req = self.client.request(method, self.url(path)).bearer_auth(TOKEN);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status().as_u16();
        let json = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, json)
    }
}

/// Start the API on a random port over a fresh on-disk database.
async fn start_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(LibSqlBackend::new_local(&dir.path().join("nudge.db")).await.unwrap());
    start_server_with(db, dir).await
}

async fn start_server_with(db: Arc<LibSqlBackend>, dir: TempDir) -> TestServer {
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm);
    let generator = Arc::new(LlmReminderGenerator::new(llm, GeneratorConfig::default()));
    let auth = StaticTokenVerifier::new(vec![(
        SecretString::from(TOKEN.to_string()),
        "user-1".to_string(),
    )]);
    let app = router(AppState::new(
        db.clone(),
        generator,
        Arc::new(SubstringMatcher),
        Arc::new(auth),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        db,
        _dir: dir,
    }
}

#[tokio::test]
async fn onboarding_to_recurring_completion() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, _) = server
            .send(
                reqwest::Method::POST,
                "/api/answers",
                Some(json!({"answers": [
                    {"category": "car", "key": "car_make", "value": "Honda Civic"},
                    {"category": "car", "key": "last_oil_change", "value": "don't remember"}
                ]})),
            )
            .await;
        assert_eq!(status, 200);

        let (status, report) = server.send(reqwest::Method::POST, "/api/generate", None).await;
        assert_eq!(status, 200);
        assert_eq!(report["generated"], 2);
        assert_eq!(report["created"], 2);

        let (_, body) = server.send(reqwest::Method::GET, "/api/reminders", None).await;
        let reminders = body["reminders"].as_array().unwrap();
        let oil = reminders.iter().find(|r| r["title"] == "Oil change").unwrap();
        let lawn = reminders.iter().find(|r| r["title"] == "Water the lawn").unwrap();
        assert_eq!(oil["recurrence_interval"], "6_months");
        assert_eq!(oil["source"], "ai");
        // Unknown category from the model falls back to personal.
        assert_eq!(lawn["category"], "personal");

        let (status, body) = server
            .send(
                reqwest::Method::PUT,
                "/api/reminders",
                Some(json!({"reminderId": oil["id"], "completed": true})),
            )
            .await;
        assert_eq!(status, 200);
        let expected = Utc::now()
            .date_naive()
            .checked_add_months(Months::new(6))
            .unwrap();
        assert_eq!(body["successor"]["due_date"], expected.to_string());
        assert_eq!(body["successor"]["parent_id"], oil["id"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn regeneration_keeps_quick_added_reminders() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server
            .send(
                reqwest::Method::POST,
                "/api/answers",
                Some(json!({
                    "answers": [{"category": "home", "key": "home_type", "value": "house"}]
                })),
            )
            .await;

        let (status, body) = server
            .send(
                reqwest::Method::POST,
                "/api/reminders/quick-add",
                Some(json!({"text": "plumber about the leak"})),
            )
            .await;
        assert_eq!(status, 201);
        assert_eq!(body["reminder"]["source"], "manual");
        let manual_id = body["reminder"]["id"].clone();

        server.send(reqwest::Method::POST, "/api/generate", None).await;
        let (status, report) = server.send(reqwest::Method::POST, "/api/generate", None).await;
        assert_eq!(status, 200);
        // The second pass replaces the first pass's two AI reminders.
        assert_eq!(report["deleted"], 2);

        let (_, body) = server.send(reqwest::Method::GET, "/api/reminders", None).await;
        let reminders = body["reminders"].as_array().unwrap();
        assert_eq!(reminders.len(), 3);
        assert!(reminders.iter().any(|r| r["id"] == manual_id));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn stale_answer_produces_checkin_that_can_be_answered() {
    timeout(TEST_TIMEOUT, async {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(LibSqlBackend::new_local(&dir.path().join("nudge.db")).await.unwrap());
        let long_ago = Utc::now().checked_sub_months(Months::new(8)).unwrap();
        db.upsert_answer("user-1", Category::Car, "car_mileage", "30000", long_ago)
            .await
            .unwrap();
        let server = start_server_with(db, dir).await;

        let (status, body) = server.send(reqwest::Method::GET, "/api/checkins", None).await;
        assert_eq!(status, 200);
        let checkins = body["checkins"].as_array().unwrap();
        assert_eq!(checkins.len(), 1);
        assert_eq!(checkins[0]["key"], "car_mileage");

        // Refreshing again does not open a second one.
        let (_, body) = server.send(reqwest::Method::GET, "/api/checkins", None).await;
        assert_eq!(body["checkins"].as_array().unwrap().len(), 1);

        let (status, _) = server
            .send(
                reqwest::Method::PUT,
                "/api/checkins",
                Some(json!({"checkinId": checkins[0]["id"], "value": "36000"})),
            )
            .await;
        assert_eq!(status, 200);

        let (_, body) = server.send(reqwest::Method::GET, "/api/checkins", None).await;
        assert!(body["checkins"].as_array().unwrap().is_empty());

        let answers = server.db.list_answers("user-1").await.unwrap();
        assert_eq!(answers[0].value, "36000");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn data_survives_reopening_the_database() {
    timeout(TEST_TIMEOUT, async {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nudge.db");
        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.upsert_answer("user-1", Category::Pets, "pet_type", "dog", Utc::now())
                .await
                .unwrap();
        }

        let db = Arc::new(LibSqlBackend::new_local(&path).await.unwrap());
        let server = start_server_with(db, dir).await;
        let (status, body) = server.send(reqwest::Method::GET, "/api/answers", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["answers"][0]["value"], "dog");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let resp = server.client.get(server.url("/api/reminders")).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 401);

        let resp = server.client.get(server.url("/health")).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    })
    .await
    .expect("test timed out");
}
