// Maps sqlx's native error type into the crate-agnostic `AppError` at the
// infra boundary (core cannot implement `From<sqlx::Error>` — ADR-001).

use taskrunner_core::AppError;

pub fn map_sqlx(err: sqlx::Error) -> AppError {
    AppError::Database(err.to_string())
}
