//! Task Runner CLI — a thin client over the daemon's HTTP API (§6), plus a
//! direct-to-store `state` subcommand for job scripts (§4.2; state/queue are
//! not part of the HTTP surface, so scripts reach them via TASKRUNNER_DB_PATH,
//! the same env var the executor injects per §6's job-script contract).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;
use tabled::Tabled;
use taskrunner_core::domain::state::parse_ttl_millis;
use taskrunner_core::port::StateStore;
use taskrunner_infra_sqlite::{create_pool, run_migrations, SqliteStateStore};

const DEFAULT_API_URL: &str = "http://127.0.0.1:1937";
const DEFAULT_DB_PATH: &str = "./data/runner.sqlite";

#[derive(Parser)]
#[command(name = "taskrunner-cli")]
#[command(about = "Command-line client for the task runner daemon", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the daemon's HTTP API
    #[arg(long, env = "TASKRUNNER_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List all jobs
    List,

    /// Show one job's details
    Show {
        /// Job id
        id: String,
    },

    /// Show recent runs for a job
    Runs {
        /// Job id
        id: String,

        /// Number of runs to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: i64,
    },

    /// Trigger a job to run immediately (synchronous)
    Run {
        /// Job id
        id: String,
    },

    /// Enable a job's schedule
    Enable {
        /// Job id
        id: String,
    },

    /// Disable a job's schedule
    Disable {
        /// Job id
        id: String,
    },

    /// Show daemon health
    Health,

    /// Show aggregate stats
    Stats,

    /// Read or write the namespaced state store directly (§4.2), bypassing
    /// the daemon's HTTP API. Intended for job scripts, which already receive
    /// the store's path via TASKRUNNER_DB_PATH.
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// Fetch a value (absent or expired rows print nothing and exit 1)
    Get {
        namespace: String,
        key: String,

        /// Path to the sqlite store (defaults to TASKRUNNER_DB_PATH, then ./data/runner.sqlite)
        #[arg(long, env = "TASKRUNNER_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },

    /// Upsert a value, optionally with a TTL (`<positive integer><d|h|m>`, e.g. `30m`)
    Set {
        namespace: String,
        key: String,
        value: String,

        #[arg(long)]
        ttl: Option<String>,

        #[arg(long, env = "TASKRUNNER_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },

    /// Delete a row
    Delete {
        namespace: String,
        key: String,

        #[arg(long, env = "TASKRUNNER_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: String,
    },
}

#[derive(Deserialize, Tabled)]
struct JobRow {
    id: String,
    name: String,
    schedule: String,
    job_type: String,
    enabled: bool,
    #[tabled(display_with = "display_option")]
    last_status: Option<String>,
}

#[derive(Deserialize, Tabled)]
struct RunRow {
    id: i64,
    status: String,
    trigger: String,
    started_at: i64,
    #[tabled(display_with = "display_option")]
    duration_ms: Option<i64>,
    #[tabled(display_with = "display_option")]
    exit_code: Option<i32>,
}

fn display_option<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

async fn get(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client.get(url).send().await.context("failed to reach daemon")?;
    handle_response(response).await
}

async fn post(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client.post(url).send().await.context("failed to reach daemon")?;
    handle_response(response).await
}

async fn handle_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response.json().await.context("failed to parse response body")?;

    if !status.is_success() {
        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("request failed")
            .to_string();
        bail!("{} ({})", message, status);
    }

    Ok(body)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    if let Err(e) = run(&cli, &client).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: &Cli, client: &reqwest::Client) -> Result<()> {
    match &cli.command {
        Commands::List => {
            let body = get(client, &format!("{}/jobs", cli.api_url)).await?;
            let jobs: Vec<JobRow> = serde_json::from_value(body["jobs"].clone())?;
            if jobs.is_empty() {
                println!("{}", "no jobs registered".yellow());
            } else {
                println!("{}", tabled::Table::new(jobs));
            }
        }

        Commands::Show { id } => {
            let body = get(client, &format!("{}/jobs/{}", cli.api_url, id)).await?;
            println!("{}", serde_json::to_string_pretty(&body["job"])?);
        }

        Commands::Runs { id, limit } => {
            let body = get(client, &format!("{}/jobs/{}/runs?limit={}", cli.api_url, id, limit)).await?;
            let runs: Vec<RunRow> = serde_json::from_value(body["runs"].clone())?;
            if runs.is_empty() {
                println!("{}", "no runs recorded".yellow());
            } else {
                println!("{}", tabled::Table::new(runs));
            }
        }

        Commands::Run { id } => {
            println!("{}", format!("triggering {id}...").cyan());
            let body = post(client, &format!("{}/jobs/{}/run", cli.api_url, id)).await?;
            let status = body["result"]["status"].as_str().unwrap_or("unknown");
            let colored_status = match status {
                "ok" => status.green().bold(),
                "error" | "timeout" => status.red().bold(),
                other => other.normal(),
            };
            println!("{} {}", "status:".bold(), colored_status);
            println!("{}", serde_json::to_string_pretty(&body["result"])?);
        }

        Commands::Enable { id } => {
            post(client, &format!("{}/jobs/{}/enable", cli.api_url, id)).await?;
            println!("{}", format!("✓ {id} enabled").green().bold());
        }

        Commands::Disable { id } => {
            post(client, &format!("{}/jobs/{}/disable", cli.api_url, id)).await?;
            println!("{}", format!("✓ {id} disabled").green().bold());
        }

        Commands::Health => {
            let body = get(client, &format!("{}/health", cli.api_url)).await?;
            println!("  {} {}", "status:".bold(), "ONLINE".green());
            println!("  {} {}s", "uptime:".bold(), body["uptime"]);
            if let Some(failed) = body["failedRegistrations"].as_array() {
                if !failed.is_empty() {
                    println!("  {} {:?}", "failed registrations:".bold().red(), failed);
                }
            }
        }

        Commands::Stats => {
            let body = get(client, &format!("{}/stats", cli.api_url)).await?;
            println!("{}", "System Stats".cyan().bold());
            println!("  {} {}", "Total jobs:".bold(), body["totalJobs"]);
            println!("  {} {}", "Running:".bold(), body["running"]);
            println!("  {} {}", "Failed registrations:".bold(), body["failedRegistrations"]);
            println!("  {} {}", "OK (last hour):".bold(), body["okLastHour"]);
            println!("  {} {}", "Errors (last hour):".bold(), body["errorsLastHour"]);
        }

        Commands::State { command } => run_state_command(command).await?,
    }

    Ok(())
}

async fn open_state_store(db_path: &str) -> Result<SqliteStateStore> {
    let pool = create_pool(db_path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open state store at {db_path}: {e}"))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("schema migration failed: {e}"))?;
    Ok(SqliteStateStore::new(pool))
}

async fn run_state_command(command: &StateCommands) -> Result<()> {
    match command {
        StateCommands::Get { namespace, key, db_path } => {
            let store = open_state_store(db_path).await?;
            match store.get(namespace, key).await? {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("{}", "no value (missing or expired)".yellow());
                    std::process::exit(1);
                }
            }
        }

        StateCommands::Set { namespace, key, value, ttl, db_path } => {
            let ttl_millis = ttl.as_deref().map(parse_ttl_millis).transpose()?;
            let store = open_state_store(db_path).await?;
            store.set(namespace, key, value, ttl_millis).await?;
            println!("{}", format!("✓ set {namespace}/{key}").green().bold());
        }

        StateCommands::Delete { namespace, key, db_path } => {
            let store = open_state_store(db_path).await?;
            store.delete(namespace, key).await?;
            println!("{}", format!("✓ deleted {namespace}/{key}").green().bold());
        }
    }

    Ok(())
}
