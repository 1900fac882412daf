use crate::db;
use crate::db::{FeedStore, StoreError};
use crate::models::feed::Feed;
use crate::sync::ingest::{ingest_item, IngestOutcome, PostCandidate};
use crate::sync::publication_date;
use crate::sync::reader::{FeedReaderError, FetchedFeedItem, ReadFeed};
use crate::sync::shutdown::Shutdown;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedSyncError {
    #[error("database error: {msg}")]
    DbError { msg: String },
    #[error(transparent)]
    FeedError(#[from] FeedReaderError),
    #[error("no feed registered with url {url}")]
    NotFound { url: String },
}

impl From<StoreError> for FeedSyncError {
    fn from(error: StoreError) -> Self {
        let msg = format!("{}", error);

        FeedSyncError::DbError { msg }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub feed_id: Uuid,
    pub feed_url: String,
    pub created: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub skipped: usize,
    pub undated: usize,
}

impl SyncReport {
    fn new(feed: &Feed) -> Self {
        Self {
            feed_id: feed.id,
            feed_url: feed.url.clone(),
            created: 0,
            duplicates: 0,
            failed: 0,
            skipped: 0,
            undated: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoFeeds,
    Synced(SyncReport),
    Cancelled(SyncReport),
}

/// One scheduling cycle: pick the least recently fetched feed, claim it,
/// fetch it and store its items.
///
/// A feed is claimed (its `last_fetched_at` is set) before the request is
/// sent. A feed that keeps failing or hanging still moves to the back of the
/// queue, at the price of counting failed fetches as fetched.
pub struct SyncFeedJob<'a, S: ?Sized, R: ?Sized> {
    store: &'a S,
    reader: &'a R,
    shutdown: &'a Shutdown,
}

impl<'a, S, R> SyncFeedJob<'a, S, R>
where
    S: FeedStore + ?Sized,
    R: ReadFeed + ?Sized,
{
    pub fn new(store: &'a S, reader: &'a R, shutdown: &'a Shutdown) -> Self {
        Self {
            store,
            reader,
            shutdown,
        }
    }

    pub fn select_and_claim(&self) -> Result<Option<Feed>, FeedSyncError> {
        match self.store.next_feed_to_fetch()? {
            None => Ok(None),
            Some(feed) => {
                self.claim(&feed)?;

                Ok(Some(feed))
            }
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleOutcome, FeedSyncError> {
        match self.select_and_claim()? {
            None => Ok(CycleOutcome::NoFeeds),
            Some(feed) => self.fetch_and_ingest(&feed).await,
        }
    }

    /// Polls one registered feed right away, outside of the regular order.
    pub async fn sync_feed_by_url(&self, url: &str) -> Result<CycleOutcome, FeedSyncError> {
        let feed = self
            .store
            .find_feed_by_url(url)?
            .ok_or_else(|| FeedSyncError::NotFound {
                url: url.to_string(),
            })?;

        self.sync_feed(&feed).await
    }

    pub async fn sync_feed(&self, feed: &Feed) -> Result<CycleOutcome, FeedSyncError> {
        self.claim(feed)?;

        self.fetch_and_ingest(feed).await
    }

    fn claim(&self, feed: &Feed) -> Result<DateTime<Utc>, FeedSyncError> {
        let fetched_at = db::current_time();

        if let Err(err) = self.store.mark_feed_fetched(feed.id, fetched_at) {
            error!("Failed to mark feed {} as fetched: {}", feed.id, err);

            return Err(err.into());
        }

        Ok(fetched_at)
    }

    async fn fetch_and_ingest(&self, feed: &Feed) -> Result<CycleOutcome, FeedSyncError> {
        let mut report = SyncReport::new(feed);

        info!("Started processing feed {} ({})", feed.id, feed.url);

        if self.shutdown.is_triggered() {
            return Ok(CycleOutcome::Cancelled(report));
        }

        let fetched_feed = tokio::select! {
            biased;

            _ = self.shutdown.triggered() => {
                info!("Fetching feed {} was cancelled", feed.id);

                return Ok(CycleOutcome::Cancelled(report));
            }
            result = self.reader.read(&feed.url) => result?,
        };

        for item in fetched_feed.items.iter() {
            if self.shutdown.is_triggered() {
                info!(
                    "Stopped processing feed {} after {} posts",
                    feed.id, report.created
                );

                return Ok(CycleOutcome::Cancelled(report));
            }

            self.process_item(feed, item, &mut report);
        }

        info!(
            "Finished processing feed {}: {} created, {} duplicates, {} failed, {} skipped",
            feed.id, report.created, report.duplicates, report.failed, report.skipped
        );

        Ok(CycleOutcome::Synced(report))
    }

    fn process_item(&self, feed: &Feed, item: &FetchedFeedItem, report: &mut SyncReport) {
        let candidate = match PostCandidate::from_item(item) {
            Some(candidate) => candidate,
            None => {
                warn!("Skipping item without link in feed {}", feed.id);
                report.skipped += 1;

                return;
            }
        };

        let published_at = match item.publication_date.as_deref() {
            None => None,
            Some(raw) => match publication_date::parse(raw) {
                Ok(date) => Some(date),
                Err(err) => {
                    warn!("{} for {} in feed {}", err, candidate.url, feed.id);

                    None
                }
            },
        };

        if published_at.is_none() {
            report.undated += 1;
        }

        match ingest_item(self.store, feed.id, &candidate, published_at) {
            IngestOutcome::Created(_) => report.created += 1,
            IngestOutcome::Duplicate => report.duplicates += 1,
            IngestOutcome::Failed(_) => report.failed += 1,
        }
    }
}
