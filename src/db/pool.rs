use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    info!("Opening database {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Database connection established");

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    let migrations = [
        include_str!("../../migrations/001_punishments.sql"),
        include_str!("../../migrations/002_active_mutes.sql"),
        include_str!("../../migrations/003_accounts.sql"),
        include_str!("../../migrations/004_shop.sql"),
        include_str!("../../migrations/005_clans.sql"),
        include_str!("../../migrations/006_love.sql"),
        include_str!("../../migrations/007_tickets.sql"),
        include_str!("../../migrations/008_custom_roles.sql"),
    ];

    for (i, migration) in migrations.iter().enumerate() {
        info!("Running migration {}", i + 1);
        for statement in migration.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            if let Err(e) = sqlx::query(statement).execute(pool).await {
                // Re-running an ADD COLUMN or CREATE is not an error
                let err_str = e.to_string();
                if !err_str.contains("already exists") && !err_str.contains("duplicate column name") {
                    return Err(e);
                }
            }
        }
    }

    info!("Migrations completed successfully");
    Ok(())
}

/// Fresh in-memory database with every migration applied.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    run_migrations(&pool).await.expect("migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool).await.expect("second run");

        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ticket_counter")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, 1);
    }
}
