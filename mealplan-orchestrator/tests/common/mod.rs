#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    routing::post,
};
use chrono::NaiveDate;
use mealplan_core::domain::job::{FailureReason, GeneratedMeal, Job, JobProgress, JobStatus};
use mealplan_core::domain::plan::{Ingredient, Meal};
use mealplan_core::dto::job::CompleteJob;
use mealplan_core::dto::worker::{WorkerInvocation, WorkerResponse};
use mealplan_orchestrator::api::create_router;
use mealplan_orchestrator::config::{Config, StorageBackend};
use mealplan_orchestrator::repository::{InMemoryStore, JobStore};
use mealplan_orchestrator::service::job_service;
use mealplan_orchestrator::state::AppState;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

/// How the fake worker answers a dispatch
#[derive(Debug, Clone, Copy)]
pub enum WorkerBehavior {
    /// Report progress, then complete every target slot
    Complete,
    /// Hold the request open without writing anything
    Sleep(Duration),
    /// Answer with this status and no writes
    Status(u16),
}

#[derive(Clone)]
struct FakeWorker {
    behavior: WorkerBehavior,
    state: AppState,
    calls: Arc<AtomicUsize>,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub owner: Uuid,
    pub worker_calls: Arc<AtomicUsize>,
}

/// Starts a fake worker and an orchestrator router wired to it
pub async fn spawn_app(behavior: WorkerBehavior) -> TestApp {
    spawn_app_with(behavior, |_| {}).await
}

pub async fn spawn_app_with(behavior: WorkerBehavior, tweak: impl FnOnce(&mut Config)) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = Config::new(format!("http://{}", addr), StorageBackend::Memory);
    tweak(&mut config);
    let (state, store) = AppState::in_memory(config).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let worker = Router::new()
        .route("/generate/{mode}", post(fake_generate))
        .with_state(FakeWorker {
            behavior,
            state: state.clone(),
            calls: calls.clone(),
        });

    tokio::spawn(async move {
        axum::serve(listener, worker).await.unwrap();
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        owner: Uuid::new_v4(),
        worker_calls: calls,
    }
}

/// URL of a local port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn fake_generate(
    State(worker): State<FakeWorker>,
    Json(invocation): Json<WorkerInvocation>,
) -> (StatusCode, Json<Value>) {
    worker.calls.fetch_add(1, Ordering::SeqCst);

    match worker.behavior {
        WorkerBehavior::Complete => {
            let slots = invocation.target.slots();
            let jobs = worker.state.jobs.as_ref();
            let events = &worker.state.events;

            job_service::record_progress(
                jobs,
                events,
                invocation.owner,
                invocation.job_id,
                JobProgress::new(0, slots.len() as u32),
            )
            .await
            .unwrap();

            let meals = slots
                .into_iter()
                .map(|slot| GeneratedMeal {
                    date: slot.date,
                    meal_type: slot.meal_type,
                    meal: sample_meal(&format!("{} by {}", slot.meal_type, invocation.job_id)),
                })
                .collect();

            job_service::complete_job(
                jobs,
                events,
                invocation.owner,
                invocation.job_id,
                CompleteJob { meals },
            )
            .await
            .unwrap();

            let response = WorkerResponse {
                job_id: invocation.job_id,
                status: JobStatus::Completed,
                error_message: None,
            };
            (StatusCode::OK, Json(serde_json::to_value(response).unwrap()))
        }
        WorkerBehavior::Sleep(duration) => {
            tokio::time::sleep(duration).await;
            (StatusCode::OK, Json(Value::Null))
        }
        WorkerBehavior::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(serde_json::json!({ "error": "model exploded" })),
        ),
    }
}

pub fn sample_meal(name: &str) -> Meal {
    Meal {
        name: name.to_string(),
        description: Some("test meal".to_string()),
        ingredients: vec![Ingredient {
            name: "rice".to_string(),
            quantity: Some("200 g".to_string()),
        }],
        steps: vec!["Cook".to_string()],
        prep_minutes: Some(25),
        nutrition: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

impl TestApp {
    /// Sends a request as this app's owner and decodes the JSON body
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request_as(Some(self.owner), method, uri, body).await
    }

    pub async fn request_as(
        &self,
        owner: Option<Uuid>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header("x-owner-id", owner.to_string());
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, value)
    }

    /// Serves the router on a local port and returns its base URL
    pub async fn serve(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Submits a job and returns its id
    pub async fn submit(&self, body: Value) -> Uuid {
        let (status, response) = self.request(Method::POST, "/job/submit", Some(body)).await;
        assert_eq!(status, StatusCode::ACCEPTED, "submit failed: {}", response);
        response["job_id"].as_str().unwrap().parse().unwrap()
    }

    /// Polls the store until the job is terminal
    pub async fn wait_terminal(&self, id: Uuid) -> Job {
        for _ in 0..200 {
            let job = self.store.find(id).await.unwrap().unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {} never reached a terminal state", id);
    }
}

pub fn failure_reason(job: &Job) -> Option<FailureReason> {
    job.error_message
        .as_deref()
        .and_then(FailureReason::from_message)
}
