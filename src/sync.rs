pub mod ingest;
pub mod publication_date;
pub mod reader;
pub mod runner;
pub mod shutdown;
pub mod sync_feed_job;

#[cfg(test)]
pub mod test_support;

pub use reader::{FetchedFeed, FetchedFeedItem, ReadFeed, RssReader};
pub use runner::{LoopState, LoopSummary, PollingLoop};
pub use sync_feed_job::{CycleOutcome, FeedSyncError, SyncFeedJob, SyncReport};
