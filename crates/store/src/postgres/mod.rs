//! PostgreSQL store implementations.

mod catalog;
mod orders;
mod users;

pub use catalog::PostgresCatalogStore;
pub use orders::PostgresOrderStore;
pub use users::PostgresUserStore;

use sqlx::PgPool;

use crate::{Result, StoreError};

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}

/// Maps a sqlx error, turning retryable and uniqueness failures into `Conflict`.
pub(crate) fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            // serialization_failure, deadlock_detected
            Some("40001") | Some("40P01") => {
                tracing::debug!(error = %db_err, "retryable database conflict");
                return StoreError::Conflict(db_err.message().to_string());
            }
            // unique_violation
            Some("23505") => {
                return StoreError::Conflict(format!(
                    "unique constraint {} violated",
                    db_err.constraint().unwrap_or("unknown")
                ));
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}
