// Route handlers for the HTTP API surface (§6).
//
// Thin translation layer: extract path/query params, call into the core
// ports/application services through `AppState`, shape the JSON response.
// No business logic lives here — that's the point of §1 calling route
// plumbing "trivial over the core".

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taskrunner_core::domain::RunStatus;

const ONE_HOUR_MS: i64 = 60 * 60 * 1000;
const DEFAULT_RUNS_LIMIT: i64 = 50;

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// GET /health (§6, §9 "the inclusive contract ... should be adopted").
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "uptime": state.started_at.elapsed().as_secs(),
        "failedRegistrations": state.cron_registry.failed_registrations(),
    }))
}

/// GET /jobs — every job row, augmented with its most recent run's status/time.
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let jobs = state.job_store.list_all().await?;
    let mut rows = Vec::with_capacity(jobs.len());
    for job in jobs {
        let mut row = serde_json::to_value(&job).map_err(taskrunner_core::AppError::from)?;
        let last_run = state.run_repo.list_for_job(&job.id, 1).await?;
        if let Some(run) = last_run.into_iter().next() {
            row["last_status"] = json!(run.status);
            row["last_run"] = json!(run.started_at);
        } else {
            row["last_status"] = Value::Null;
            row["last_run"] = Value::Null;
        }
        rows.push(row);
    }
    Ok(Json(json!({ "jobs": rows })))
}

/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let job = state
        .job_store
        .find_by_id(&id)
        .await?
        .ok_or_else(|| taskrunner_core::AppError::NotFound(format!("job not found: {id}")))?;
    Ok(Json(json!({ "job": job })))
}

#[derive(Deserialize)]
pub struct RunsQuery {
    limit: Option<i64>,
}

/// GET /jobs/:id/runs?limit=N
pub async fn list_runs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RUNS_LIMIT);
    let runs = state.run_repo.list_for_job(&id, limit).await?;
    Ok(Json(json!({ "runs": runs })))
}

/// POST /jobs/:id/run — synchronous manual trigger (§4.7 `trigger_job`).
pub async fn trigger_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = state.run_controller.trigger_job(&id).await?;
    Ok(Json(json!({ "result": result })))
}

#[derive(Serialize)]
struct OkBody {
    ok: bool,
}

/// POST /jobs/:id/enable
pub async fn enable_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    set_enabled(&state, &id, true).await
}

/// POST /jobs/:id/disable
pub async fn disable_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    set_enabled(&state, &id, false).await
}

async fn set_enabled(state: &AppState, id: &str, enabled: bool) -> Result<Json<OkBody>, ApiError> {
    let found = state
        .job_store
        .set_enabled(&id.to_string(), enabled, now_millis())
        .await?;
    if !found {
        return Err(taskrunner_core::AppError::NotFound(format!("job not found: {id}")).into());
    }
    // §6: enable/disable "triggers reconcileNow" so a live edit takes effect
    // without waiting for the next periodic reconciliation (§4.7 reconcileNow).
    if let Err(e) = state.cron_registry.reconcile().await {
        tracing::warn!(job_id = id, error = %e, "reconcile after enable/disable failed");
    }
    Ok(Json(OkBody { ok: true }))
}

/// GET /stats (§6, §9 "omits failedRegistrations ... align on inclusion").
pub async fn stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let jobs = state.job_store.list_all().await?;
    let since = now_millis() - ONE_HOUR_MS;
    let ok_last_hour = state.run_repo.count_since(RunStatus::Ok, since).await?;
    let errors_last_hour = {
        let errors = state.run_repo.count_since(RunStatus::Error, since).await?;
        let timeouts = state.run_repo.count_since(RunStatus::Timeout, since).await?;
        errors + timeouts
    };

    Ok(Json(json!({
        "totalJobs": jobs.len(),
        "running": state.run_controller.running_count(),
        "failedRegistrations": state.cron_registry.failed_registrations().len(),
        "okLastHour": ok_last_hour,
        "errorsLastHour": errors_last_hour,
    })))
}
