use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use sea_orm_migration::MigratorTrait;

use crate::{error::AppError, migration::Migrator};

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);
    // An in-memory SQLite database only lives as long as its connection.
    if database_url.starts_with("sqlite::memory:") {
        options.max_connections(1).min_connections(1);
    }
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply every pending migration.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    Migrator::up(conn, None).await?;
    Ok(())
}

/// Classify a failed write: constraint violations are the caller's fault,
/// everything else stays an internal store error.
pub fn classify_write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
            tracing::debug!(%detail, "foreign key violation");
            AppError::InvalidReference
        }
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::debug!(%detail, "unique constraint violation");
            AppError::IntegrityViolation
        }
        _ => AppError::Database(err),
    }
}
