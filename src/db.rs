use crate::config::Config;
use chrono::prelude::*;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;

#[cfg(test)]
use diesel::connection::Connection;

#[cfg(test)]
use dotenv::dotenv;

pub mod feed_follows;
pub mod feeds;
pub mod posts;
pub mod store;
pub mod users;

pub use store::{FeedStore, InsertOutcome, NewPost, PgFeedStore, StoreError};

#[cfg(test)]
pub use store::MockFeedStore;

pub type Pool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug, Error)]
pub enum DbSetupError {
    #[error("failed to build connection pool: {0}")]
    Pool(#[from] r2d2::PoolError),
    #[error("failed to run migrations: {0}")]
    Migration(String),
}

#[cfg(test)]
pub fn establish_test_connection() -> PgConnection {
    dotenv().ok();

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for database tests");

    let mut connection =
        PgConnection::establish(&url).unwrap_or_else(|_| panic!("Error connecting to {}", url));

    connection
        .run_pending_migrations(MIGRATIONS)
        .expect("failed to run migrations");

    connection
}

pub fn current_time() -> DateTime<Utc> {
    Utc::now().round_subsecs(0)
}

pub fn create_connection_pool(config: &Config) -> Result<Pool, DbSetupError> {
    let manager = r2d2::ConnectionManager::<PgConnection>::new(config.database_url());

    let pool = r2d2::Pool::builder()
        .max_size(config.database_pool_size())
        .build(manager)?;

    Ok(pool)
}

pub fn run_migrations(pool: &Pool) -> Result<(), DbSetupError> {
    let mut connection = pool.get()?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| DbSetupError::Migration(error.to_string()))?;

    if !applied.is_empty() {
        log::info!("Applied {} database migrations", applied.len());
    }

    Ok(())
}
