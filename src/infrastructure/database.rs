//! Pooled SQLite connection

use crate::infrastructure::error::StorageError;
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::ops::Deref;
use std::str::FromStr;

/// The application's connection pool, built once at start-up and registered
/// with the service provider as a singleton.
pub struct DatabaseConnection {
    connection: SqlitePool,
}

impl DatabaseConnection {
    /// Opens (creating if missing) the database at `url` and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("connected to database, running migrations");
        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, applying pending migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<DatabaseConnection, StorageError> {
        sqlx::migrate!().run(&pool).await?;
        Ok(DatabaseConnection { connection: pool })
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}
