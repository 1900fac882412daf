use crate::db::{feeds, posts, Pool};
use crate::models::feed::Feed;
use chrono::{DateTime, Utc};
use diesel::r2d2::PoolError;
use thiserror::Error;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

pub use crate::db::posts::{InsertOutcome, NewPost};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to get a database connection: {0}")]
    Pool(#[from] PoolError),
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),
}

/// Data access used by the sync pipeline.
///
/// Every call is a separate, immediately committed statement. Nothing here
/// locks rows, so only one poller may claim feeds at a time.
#[cfg_attr(test, automock)]
pub trait FeedStore: Send + Sync {
    /// Least recently fetched feed, never fetched feeds first.
    fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError>;

    fn mark_feed_fetched(&self, feed_id: Uuid, fetched_at: DateTime<Utc>)
        -> Result<(), StoreError>;

    fn create_post(&self, new_post: &NewPost) -> Result<InsertOutcome, StoreError>;

    fn find_feed_by_url(&self, url: &str) -> Result<Option<Feed>, StoreError>;
}

#[derive(Clone)]
pub struct PgFeedStore {
    pool: Pool,
}

impl PgFeedStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl FeedStore for PgFeedStore {
    fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError> {
        let mut connection = self.pool.get()?;

        Ok(feeds::find_next_to_fetch(&mut connection)?)
    }

    fn mark_feed_fetched(
        &self,
        feed_id: Uuid,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut connection = self.pool.get()?;

        feeds::mark_fetched(&mut connection, feed_id, fetched_at)?;

        Ok(())
    }

    fn create_post(&self, new_post: &NewPost) -> Result<InsertOutcome, StoreError> {
        let mut connection = self.pool.get()?;

        Ok(posts::create(&mut connection, new_post)?)
    }

    fn find_feed_by_url(&self, url: &str) -> Result<Option<Feed>, StoreError> {
        let mut connection = self.pool.get()?;

        Ok(feeds::find_by_url(&mut connection, url)?)
    }
}
