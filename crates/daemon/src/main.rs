//! Task Runner - Main Entry Point
//!
//! Composition root (ADR-001): wires the SQLite store, the script and
//! session executors, the cron registry, maintenance sweeps, and the HTTP
//! API into one running process, then waits for a shutdown signal.

mod config;
mod telemetry;

use anyhow::Result;
use config::AppConfig;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taskrunner_api_http::AppState;
use taskrunner_core::application::{CronRegistry, MaintenanceScheduler, RecoveryService, RunController, SessionExecutor};
use taskrunner_core::port::cron_scheduler::FireCallback;
use taskrunner_core::port::time_provider::SystemTimeProvider;
use taskrunner_core::port::MaintenanceConfig;
use taskrunner_infra_gateway::{HttpGatewayClient, WebhookNotifier};
use taskrunner_infra_sqlite::{create_pool, run_migrations, SqliteJobStore, SqliteMaintenance, SqliteRunRepository};
use taskrunner_infra_system::{ScriptExecutor, TokioCronBackend};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn init_logging() {
    let log_format = std::env::var("TASKRUNNER_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("taskrunner=info"))
        .expect("failed to build env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    if let Err(e) = telemetry::init_telemetry() {
        warn!(error = ?e, "failed to initialize OpenTelemetry, continuing without it");
    }

    info!(version = VERSION, "task runner starting");

    // 1. Configuration (§6)
    let cfg = AppConfig::load()?;
    let db_path = shellexpand::tilde(&cfg.db_path).into_owned();
    info!(db_path = %db_path, port = cfg.port, max_concurrency = cfg.max_concurrency, "configuration loaded");

    // 2. Store (§4.1)
    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("database pool creation failed: {e}"))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("schema migration failed: {e}"))?;

    // 3. Dependency wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let job_store: Arc<dyn taskrunner_core::port::JobStore> = Arc::new(SqliteJobStore::new(pool.clone()));
    let run_repo: Arc<dyn taskrunner_core::port::RunRepository> = Arc::new(SqliteRunRepository::new(pool.clone()));

    let gateway = Arc::new(HttpGatewayClient::new(
        cfg.gateway.url.clone(),
        cfg.gateway.token_path.as_deref(),
    ));
    let script_executor: Arc<dyn taskrunner_core::port::TaskExecutor> = Arc::new(ScriptExecutor::new(db_path.clone()));
    let session_executor: Arc<dyn taskrunner_core::port::TaskExecutor> = Arc::new(SessionExecutor::new(gateway));

    let notifier: Arc<dyn taskrunner_core::port::Notifier> = match &cfg.notifications.slack_token_path {
        Some(path) => Arc::new(WebhookNotifier::new(Some(path.clone()))),
        None => Arc::new(taskrunner_infra_gateway::webhook_notifier::NoopNotifier),
    };

    let run_controller = Arc::new(RunController::new(
        job_store.clone(),
        run_repo.clone(),
        script_executor,
        session_executor,
        notifier.clone(),
        time_provider.clone(),
        cfg.max_concurrency,
    ));

    // 4. Crash recovery (§9 ambient decision): close out runs orphaned by a previous process.
    info!("running crash recovery");
    let recovery = RecoveryService::new(run_repo.clone(), time_provider.clone());
    match recovery.recover_orphaned_runs().await {
        Ok(count) => info!(recovered = count, "crash recovery complete"),
        Err(e) => error!(error = %e, "crash recovery failed"),
    }

    // 5. Cron registry (§4.6): dependency-inverted callback that re-reads the job
    // row before dispatching, so a disabled/edited job never fires stale.
    let cron_backend = Arc::new(
        TokioCronBackend::new()
            .await
            .map_err(|e| anyhow::anyhow!("cron backend start failed: {e}"))?,
    );

    let fire_job_store = job_store.clone();
    let fire_run_controller = run_controller.clone();
    let on_fire: Arc<dyn Fn(String) -> FireCallback + Send + Sync> = Arc::new(move |job_id: String| {
        let job_store = fire_job_store.clone();
        let run_controller = fire_run_controller.clone();
        let callback: FireCallback = Arc::new(move || {
            let job_store = job_store.clone();
            let run_controller = run_controller.clone();
            let job_id = job_id.clone();
            Box::pin(async move {
                match job_store.find_by_id(&job_id).await {
                    Ok(Some(job)) if job.enabled => {
                        run_controller.on_scheduled_run(&job).await;
                    }
                    Ok(_) => {
                        info!(job_id = %job_id, "job missing or disabled at fire time, skipping");
                    }
                    Err(e) => {
                        error!(job_id = %job_id, error = %e, "failed to re-read job at fire time");
                    }
                }
            })
        });
        callback
    });

    let cron_registry = Arc::new(CronRegistry::new(job_store.clone(), cron_backend, on_fire));

    // 6. Initial reconciliation + optional periodic reconciliation (§4.7 start()).
    let report = cron_registry
        .reconcile()
        .await
        .map_err(|e| anyhow::anyhow!("initial cron reconciliation failed: {e}"))?;
    info!(
        total_enabled = report.total_enabled,
        failed = report.failed_ids.len(),
        "cron registry reconciled"
    );
    if !report.failed_ids.is_empty() {
        if let Some(channel) = &cfg.notifications.default_on_failure {
            let message = format!(
                "{} job registration(s) failed at startup: {}",
                report.failed_ids.len(),
                report.failed_ids.join(", ")
            );
            if let Err(e) = notifier.notify_failure("cron-registry", 0, &message, channel).await {
                warn!(error = %e, "failed to send registration-failure summary notification");
            }
        }
    }

    let reconcile_handle = if cfg.reconcile_interval_ms > 0 {
        let registry = cron_registry.clone();
        let interval_ms = cfg.reconcile_interval_ms;
        Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            tick.tick().await; // first tick is immediate; we already reconciled above
            loop {
                tick.tick().await;
                if let Err(e) = registry.reconcile().await {
                    error!(error = %e, "periodic cron reconciliation failed");
                }
            }
        }))
    } else {
        None
    };

    // 7. Maintenance (§4.8): immediately, then every `state_cleanup_interval_ms`.
    let maintenance = Arc::new(SqliteMaintenance::new(pool.clone()));
    let maintenance_config = MaintenanceConfig {
        run_retention_days: cfg.run_retention_days,
        default_queue_retention_days: 7,
    };
    let maintenance_scheduler = MaintenanceScheduler::new(maintenance, maintenance_config, cfg.state_cleanup_interval_ms);
    tokio::spawn(maintenance_scheduler.run());

    // 8. HTTP API (§6), bound to loopback only.
    let app_state = AppState {
        job_store,
        run_repo,
        run_controller: run_controller.clone(),
        cron_registry,
        started_at: Instant::now(),
        max_concurrency: cfg.max_concurrency,
    };
    let router = taskrunner_api_http::router(app_state);

    let addr = format!("127.0.0.1:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!(addr = %addr, "HTTP API listening");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = (&mut shutdown_rx).await;
            })
            .await
    });

    info!("system ready, waiting for jobs");
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("SIGINT received, draining in-flight runs"),
            _ = sigterm.recv() => info!("SIGTERM received, draining in-flight runs"),
        }
    }

    if let Some(handle) = reconcile_handle {
        handle.abort();
    }
    let _ = shutdown_tx.send(());
    run_controller.wait_for_drain(cfg.shutdown_grace_ms).await;
    let _ = server.await;

    info!("shutdown complete");
    Ok(())
}
