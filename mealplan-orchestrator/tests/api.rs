mod common;

use axum::http::{Method, StatusCode};
use common::{WorkerBehavior, date, failure_reason, spawn_app, spawn_app_with};
use mealplan_core::domain::job::{FailureReason, JobStatus};
use mealplan_core::domain::plan::DayPlan;
use mealplan_core::domain::slot::MealType;
use mealplan_client::{JobOutcome, JobWatcher, OrchestratorClient};
use mealplan_core::dto::job::PendingJobs;
use mealplan_orchestrator::repository::JobStore;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn single_dinner_is_generated_and_stored() {
    let app = spawn_app(WorkerBehavior::Complete).await;

    let id = app
        .submit(json!({
            "mode": "single",
            "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "dinner" },
            "constraints": { "dietary": ["vegetarian"] }
        }))
        .await;

    let job = app.wait_terminal(id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result.unwrap().meals.len(), 1);
    assert_eq!(app.store.meal_write_count(), 1);

    let (status, body) = app.request(Method::GET, "/plan/day/2025-06-01", None).await;
    assert_eq!(status, StatusCode::OK);
    let plan: DayPlan = serde_json::from_value(body).unwrap();
    assert_eq!(plan.meals.len(), 1);
    assert_eq!(plan.meals[0].meal_type, MealType::Dinner);
    assert_eq!(plan.meals[0].job_id, id);

    let (status, body) = app.request(Method::GET, &format!("/job/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn crashed_worker_job_is_reclaimed_as_stale() {
    let app = spawn_app_with(WorkerBehavior::Sleep(Duration::from_secs(30)), |config| {
        config.stale_timeout = Duration::from_millis(200);
    })
    .await;

    let id = app
        .submit(json!({
            "mode": "single",
            "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "lunch" }
        }))
        .await;

    let (status, body) = app.request(Method::GET, "/job/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    let pending: PendingJobs = serde_json::from_value(body).unwrap();
    assert_eq!(pending.active.len(), 1);

    tokio::time::sleep(Duration::from_millis(350)).await;

    let (_, body) = app.request(Method::GET, "/job/pending", None).await;
    let pending: PendingJobs = serde_json::from_value(body).unwrap();
    assert!(pending.active.is_empty());
    assert_eq!(pending.reclaimed, vec![id]);

    let job = app.store.find(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(failure_reason(&job), Some(FailureReason::StaleRequestTimeout));

    // A resubmission for the same slot is no longer blocked
    app.submit(json!({
        "mode": "single",
        "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "lunch" }
    }))
    .await;
}

#[tokio::test]
async fn reading_a_crashed_job_reclaims_it() {
    let app = spawn_app_with(WorkerBehavior::Sleep(Duration::from_secs(30)), |config| {
        config.stale_timeout = Duration::from_millis(200);
    })
    .await;

    let id = app
        .submit(json!({
            "mode": "single",
            "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "lunch" }
        }))
        .await;

    let (_, body) = app.request(Method::GET, &format!("/job/{}", id), None).await;
    assert_eq!(body["status"], "pending");

    tokio::time::sleep(Duration::from_millis(350)).await;

    let (status, body) = app.request(Method::GET, &format!("/job/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");

    let job = app.store.find(id).await.unwrap().unwrap();
    assert_eq!(failure_reason(&job), Some(FailureReason::StaleRequestTimeout));
}

#[tokio::test]
async fn watching_a_crashed_job_ends_as_stale() {
    let app = spawn_app_with(WorkerBehavior::Sleep(Duration::from_secs(30)), |config| {
        config.stale_timeout = Duration::from_millis(200);
    })
    .await;

    let id = app
        .submit(json!({
            "mode": "weekly",
            "target": { "kind": "week", "start_date": "2025-06-02", "meal_types": ["dinner"] }
        }))
        .await;

    let client = OrchestratorClient::new(app.serve().await).with_owner(app.owner);
    let watcher = JobWatcher::new(client).with_poll_interval(Duration::from_millis(50));

    let mut seen = Vec::new();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        watcher.watch(id, |update| seen.push(update.status)),
    )
    .await
    .expect("watch never ended")
    .unwrap();

    match outcome {
        JobOutcome::Failed(message) => assert_eq!(
            FailureReason::from_message(&message),
            Some(FailureReason::StaleRequestTimeout)
        ),
        other => panic!("expected a stale failure, got {:?}", other),
    }
    assert_eq!(seen.last(), Some(&JobStatus::Failed));
}

#[tokio::test]
async fn regenerating_dinner_leaves_other_meals_untouched() {
    let app = spawn_app(WorkerBehavior::Complete).await;

    let first = app
        .submit(json!({
            "mode": "multi_slot",
            "target": { "kind": "slots", "slots": [
                { "date": "2025-06-03", "meal_type": "breakfast" },
                { "date": "2025-06-03", "meal_type": "lunch" },
                { "date": "2025-06-03", "meal_type": "dinner" }
            ]}
        }))
        .await;
    assert_eq!(app.wait_terminal(first).await.status, JobStatus::Completed);

    let (_, body) = app.request(Method::GET, "/plan/day/2025-06-03", None).await;
    let before: DayPlan = serde_json::from_value(body).unwrap();
    let old_dinner = before.meal(MealType::Dinner).unwrap().clone();

    let second = app
        .submit(json!({
            "mode": "regenerate",
            "target": {
                "kind": "slot",
                "date": "2025-06-03",
                "meal_type": "dinner",
                "existing_meal_id": old_dinner.id
            }
        }))
        .await;
    assert_eq!(app.wait_terminal(second).await.status, JobStatus::Completed);

    let (_, body) = app.request(Method::GET, "/plan/day/2025-06-03", None).await;
    let after: DayPlan = serde_json::from_value(body).unwrap();

    assert_eq!(after.meals.len(), 3);
    assert_eq!(after.meal(MealType::Dinner).unwrap().job_id, second);
    assert_ne!(after.meal(MealType::Dinner).unwrap().meal, old_dinner.meal);
    for meal_type in [MealType::Breakfast, MealType::Lunch] {
        assert_eq!(after.meal(meal_type), before.meal(meal_type));
    }
    assert_eq!(app.store.meal_write_count(), 4);
}

#[tokio::test]
async fn overlapping_submission_is_rejected() {
    let app = spawn_app(WorkerBehavior::Sleep(Duration::from_secs(30))).await;

    let weekly = app
        .submit(json!({
            "mode": "weekly",
            "target": { "kind": "week", "start_date": "2025-06-02" }
        }))
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/job/submit",
            Some(json!({
                "mode": "single",
                "target": { "kind": "slot", "date": "2025-06-04", "meal_type": "breakfast" }
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["existing_job_id"], json!(weekly));

    // Snacks are outside the weekly target
    app.submit(json!({
        "mode": "single",
        "target": { "kind": "slot", "date": "2025-06-04", "meal_type": "snack" }
    }))
    .await;
}

#[tokio::test]
async fn overlapping_submission_is_accepted_when_allowed() {
    let app = spawn_app_with(WorkerBehavior::Sleep(Duration::from_secs(30)), |config| {
        config.duplicate_policy = mealplan_orchestrator::config::DuplicatePolicy::Allow;
    })
    .await;

    let body = json!({
        "mode": "single",
        "target": { "kind": "slot", "date": "2025-06-04", "meal_type": "dinner" }
    });
    let first = app.submit(body.clone()).await;

    let (status, response) = app.request(Method::POST, "/job/submit", Some(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response["duplicate_of"], json!(first));
}

#[tokio::test]
async fn invalid_target_is_rejected_synchronously() {
    let app = spawn_app(WorkerBehavior::Complete).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/job/submit",
            Some(json!({
                "mode": "weekly",
                "target": { "kind": "slot", "date": "2025-06-04", "meal_type": "dinner" }
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("week"));
    assert!(app.store.find_active(app.owner).await.unwrap().is_empty());
    assert_eq!(app.worker_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn week_past_the_calendar_end_is_rejected() {
    let app = spawn_app(WorkerBehavior::Complete).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/job/submit",
            Some(json!({
                "mode": "weekly",
                "target": { "kind": "week", "start_date": "+262142-12-30", "meal_types": ["dinner"] }
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("calendar range"));
    assert!(app.store.find_active(app.owner).await.unwrap().is_empty());
    assert_eq!(app.worker_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn worker_error_status_fails_the_job() {
    let app = spawn_app(WorkerBehavior::Status(500)).await;

    let id = app
        .submit(json!({
            "mode": "single",
            "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "dinner" }
        }))
        .await;

    let job = app.wait_terminal(id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(failure_reason(&job), Some(FailureReason::WorkerHttpError));
    assert!(job.error_message.unwrap().contains("500"));
}

#[tokio::test]
async fn requests_are_scoped_to_the_owner() {
    let app = spawn_app(WorkerBehavior::Sleep(Duration::from_secs(30))).await;

    let id = app
        .submit(json!({
            "mode": "single",
            "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "dinner" }
        }))
        .await;

    let (status, _) = app
        .request_as(None, Method::GET, &format!("/job/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request_as(Some(Uuid::new_v4()), Method::GET, &format!("/job/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.request(Method::GET, "/plan/day/2030-01-01", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn late_completion_after_reclaim_conflicts() {
    let app = spawn_app_with(WorkerBehavior::Sleep(Duration::from_secs(30)), |config| {
        config.stale_timeout = Duration::from_millis(100);
    })
    .await;

    let id = app
        .submit(json!({
            "mode": "single",
            "target": { "kind": "slot", "date": "2025-06-01", "meal_type": "dinner" }
        }))
        .await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    app.request(Method::GET, "/job/pending", None).await;

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/job/{}/complete", id),
            Some(json!({ "meals": [{
                "date": "2025-06-01",
                "meal_type": "dinner",
                "meal": { "name": "Too late" }
            }]})),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.store.meal_write_count(), 0);
    let job = app.store.find(id).await.unwrap().unwrap();
    assert_eq!(failure_reason(&job), Some(FailureReason::StaleRequestTimeout));
}

#[tokio::test]
async fn event_stream_replays_terminal_state() {
    let app = spawn_app(WorkerBehavior::Complete).await;

    let id = app
        .submit(json!({
            "mode": "regenerate",
            "target": { "kind": "day", "date": date(2025, 6, 5), "meal_types": ["lunch", "dinner"] }
        }))
        .await;
    app.wait_terminal(id).await;

    let (status, body) = app
        .request(Method::GET, &format!("/job/{}/events", id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("event: job_update"));
    assert!(text.contains("\"status\":\"completed\""));
}
