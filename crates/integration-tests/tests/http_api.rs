// HTTP API surface (§6) driven end-to-end through the real axum router.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;

use taskrunner_api_http::{router, AppState};
use taskrunner_core::application::{CronRegistry, RunController};
use taskrunner_core::domain::{Job, JobType};
use taskrunner_core::port::cron_scheduler::mocks::InMemoryCronBackend;
use taskrunner_core::port::task_executor::mocks::MockTaskExecutor;
use taskrunner_core::port::time_provider::SystemTimeProvider;
use taskrunner_core::port::{JobStore, RunRepository};
use taskrunner_infra_gateway::webhook_notifier::NoopNotifier;
use taskrunner_infra_sqlite::{create_pool, run_migrations, SqliteJobStore, SqliteRunRepository};

fn file_db_url(name: &str) -> String {
    let dir = std::env::temp_dir().join(format!("taskrunner-it-http-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    format!("sqlite://{}/db.sqlite", dir.display())
}

async fn build_state(db_name: &str) -> AppState {
    let pool = create_pool(&file_db_url(db_name)).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let job_store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(pool.clone()));
    let run_repo: Arc<dyn RunRepository> = Arc::new(SqliteRunRepository::new(pool.clone()));
    let executor = Arc::new(MockTaskExecutor::new_success());

    let run_controller = Arc::new(RunController::new(
        job_store.clone(),
        run_repo.clone(),
        executor.clone(),
        executor,
        Arc::new(NoopNotifier),
        Arc::new(SystemTimeProvider),
        4,
    ));

    let cron_registry = Arc::new(CronRegistry::new(
        job_store.clone(),
        Arc::new(InMemoryCronBackend::default()),
        Arc::new(|_id: String| -> taskrunner_core::port::cron_scheduler::FireCallback {
            Arc::new(|| Box::pin(async {}))
        }),
    ));

    AppState {
        job_store,
        run_repo,
        run_controller,
        cron_registry,
        started_at: Instant::now(),
        max_concurrency: 4,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_uptime() {
    let state = build_state("health").await;
    let app = router(state);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], Value::Bool(true));
    assert!(body["failedRegistrations"].is_array());
}

#[tokio::test]
async fn list_and_get_job_round_trip() {
    let state = build_state("jobs").await;
    let job = Job::new("job-a", "job a", "* * * * *", "echo hi", JobType::Script, 0);
    state.job_store.insert(&job).await.unwrap();
    let app = router(state);

    let list_response = app.clone().oneshot(get("/jobs")).await.unwrap();
    assert_eq!(list_response.status(), StatusCode::OK);
    let body = body_json(list_response).await;
    assert_eq!(body["jobs"].as_array().unwrap().len(), 1);
    assert!(body["jobs"][0]["last_status"].is_null());

    let found = app.clone().oneshot(get("/jobs/job-a")).await.unwrap();
    assert_eq!(found.status(), StatusCode::OK);
    let body = body_json(found).await;
    assert_eq!(body["job"]["id"], "job-a");

    let missing = app.oneshot(get("/jobs/does-not-exist")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn trigger_run_executes_and_is_visible_in_run_history() {
    let state = build_state("trigger").await;
    let job = Job::new("job-b", "job b", "* * * * *", "echo hi", JobType::Script, 0);
    state.job_store.insert(&job).await.unwrap();
    let app = router(state);

    let run_response = app.clone().oneshot(post("/jobs/job-b/run")).await.unwrap();
    assert_eq!(run_response.status(), StatusCode::OK);
    let body = body_json(run_response).await;
    assert_eq!(body["result"]["status"], "ok");

    let runs_response = app.oneshot(get("/jobs/job-b/runs")).await.unwrap();
    let body = body_json(runs_response).await;
    assert_eq!(body["runs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn enable_disable_toggle_persists_and_reports_not_found_for_unknown_job() {
    let state = build_state("toggle").await;
    let job = Job::new("job-c", "job c", "* * * * *", "echo hi", JobType::Script, 0);
    state.job_store.insert(&job).await.unwrap();
    let app = router(state);

    let disable_response = app.clone().oneshot(post("/jobs/job-c/disable")).await.unwrap();
    assert_eq!(disable_response.status(), StatusCode::OK);

    let job_response = app.clone().oneshot(get("/jobs/job-c")).await.unwrap();
    let body = body_json(job_response).await;
    assert_eq!(body["job"]["enabled"], Value::Bool(false));

    let enable_response = app.clone().oneshot(post("/jobs/job-c/enable")).await.unwrap();
    assert_eq!(enable_response.status(), StatusCode::OK);

    let missing_response = app.oneshot(post("/jobs/unknown/enable")).await.unwrap();
    assert_eq!(missing_response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_reflects_job_and_run_counts() {
    let state = build_state("stats").await;
    let job = Job::new("job-d", "job d", "* * * * *", "echo hi", JobType::Script, 0);
    state.job_store.insert(&job).await.unwrap();
    let app = router(state);

    app.clone().oneshot(post("/jobs/job-d/run")).await.unwrap();

    let response = app.oneshot(get("/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalJobs"], 1);
    assert_eq!(body["okLastHour"], 1);
}
