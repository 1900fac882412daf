use crate::config::ConfigError;
use crate::db::FeedStore;
use crate::sync::reader::ReadFeed;
use crate::sync::shutdown::Shutdown;
use crate::sync::sync_feed_job::{CycleOutcome, SyncFeedJob};
use log::{error, info};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Fetching,
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: usize,
    pub failed_cycles: usize,
}

/// Syncs one feed per tick until shutdown is triggered.
pub struct PollingLoop<'a, S: ?Sized, R: ?Sized> {
    store: &'a S,
    reader: &'a R,
    interval: Duration,
    shutdown: Shutdown,
    state: LoopState,
}

impl<'a, S, R> PollingLoop<'a, S, R>
where
    S: FeedStore + ?Sized,
    R: ReadFeed + ?Sized,
{
    pub fn new(
        store: &'a S,
        reader: &'a R,
        interval: Duration,
        shutdown: Shutdown,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(Self {
            store,
            reader,
            interval,
            shutdown,
            state: LoopState::Idle,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub async fn run(&mut self) -> LoopSummary {
        let mut summary = LoopSummary::default();
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Collecting feeds every {:?}", self.interval);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.triggered() => break,
                _ = interval.tick() => {}
            }

            self.state = LoopState::Fetching;
            summary.cycles += 1;

            let job = SyncFeedJob::new(self.store, self.reader, &self.shutdown);

            let cancelled = match job.run_cycle().await {
                Ok(CycleOutcome::NoFeeds) => {
                    info!("No feeds to fetch");
                    false
                }
                Ok(CycleOutcome::Synced(_)) => false,
                Ok(CycleOutcome::Cancelled(report)) => {
                    info!("Cycle for feed {} was cancelled", report.feed_url);
                    true
                }
                Err(err) => {
                    error!("Failed to sync feed: {}", err);
                    summary.failed_cycles += 1;
                    false
                }
            };

            self.state = LoopState::Idle;

            if cancelled {
                break;
            }
        }

        self.state = LoopState::Stopped;

        info!(
            "Stopped polling after {} cycles ({} failed)",
            summary.cycles, summary.failed_cycles
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::{LoopState, LoopSummary, PollingLoop};
    use crate::config::ConfigError;
    use crate::db::{InsertOutcome, MockFeedStore};
    use crate::models::post::Post;
    use crate::sync::reader::{FeedReaderError, FetchedFeed};
    use crate::sync::shutdown;
    use crate::sync::test_support::{example_feed, feed, MemoryStore, StaticReader};
    use std::time::Duration;
    use tokio::time;

    #[test]
    fn it_rejects_zero_interval() {
        let store = MemoryStore::default();
        let reader = StaticReader::new(Ok(FetchedFeed::default()));
        let (_trigger, shutdown) = shutdown::channel();

        let result = PollingLoop::new(&store, &reader, Duration::ZERO, shutdown);

        assert!(matches!(result, Err(ConfigError::ZeroInterval)));
    }

    #[tokio::test(start_paused = true)]
    async fn it_fetches_single_feed_on_every_tick() {
        let registered = feed("https://blog.example.com/rss", None);
        let store = MemoryStore::with_feeds(vec![registered.clone()]);
        let reader = StaticReader::new(Ok(example_feed()));
        let (trigger, shutdown) = shutdown::channel();

        let mut polling_loop =
            PollingLoop::new(&store, &reader, Duration::from_secs(60), shutdown).unwrap();

        let stop = async {
            time::sleep(Duration::from_secs(90)).await;
            trigger.trigger();
        };

        let (summary, _) = tokio::join!(polling_loop.run(), stop);

        assert_eq!(
            summary,
            LoopSummary {
                cycles: 2,
                failed_cycles: 0
            }
        );
        assert_eq!(polling_loop.state(), LoopState::Stopped);
        assert_eq!(store.claims(), vec![registered.id, registered.id]);
        assert_eq!(reader.reads(), 2);
        assert_eq!(store.posts().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn it_keeps_polling_after_failed_cycle() {
        let store = MemoryStore::with_feeds(vec![feed("https://down.example.com/rss", None)]);
        let reader = StaticReader::new(Err(FeedReaderError::Status { code: 500 }));
        let (trigger, shutdown) = shutdown::channel();

        let mut polling_loop =
            PollingLoop::new(&store, &reader, Duration::from_secs(10), shutdown).unwrap();

        let stop = async {
            time::sleep(Duration::from_secs(25)).await;
            trigger.trigger();
        };

        let (summary, _) = tokio::join!(polling_loop.run(), stop);

        assert_eq!(
            summary,
            LoopSummary {
                cycles: 3,
                failed_cycles: 3
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn it_stops_right_after_a_cycle_cancelled_mid_feed() {
        let registered = feed("https://blog.example.com/rss", None);
        let (trigger, shutdown) = shutdown::channel();

        let mut store = MockFeedStore::new();
        let next = registered.clone();
        store
            .expect_next_feed_to_fetch()
            .times(1)
            .returning(move || Ok(Some(next.clone())));
        store
            .expect_mark_feed_fetched()
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_create_post()
            .times(1)
            .returning(move |new_post| {
                trigger.trigger();

                Ok(InsertOutcome::Created(Post {
                    id: new_post.id,
                    created_at: new_post.created_at,
                    updated_at: new_post.updated_at,
                    title: new_post.title.clone(),
                    url: new_post.url.clone(),
                    description: new_post.description.clone(),
                    published_at: new_post.published_at,
                    feed_id: new_post.feed_id,
                }))
            });

        let reader = StaticReader::new(Ok(example_feed()));

        let mut polling_loop =
            PollingLoop::new(&store, &reader, Duration::from_secs(60), shutdown).unwrap();

        let summary = polling_loop.run().await;

        assert_eq!(
            summary,
            LoopSummary {
                cycles: 1,
                failed_cycles: 0
            }
        );
        assert_eq!(polling_loop.state(), LoopState::Stopped);
        assert_eq!(reader.reads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn it_stops_without_fetching_when_cancelled_up_front() {
        let store = MemoryStore::with_feeds(vec![feed("https://blog.example.com/rss", None)]);
        let reader = StaticReader::new(Ok(example_feed()));
        let (trigger, shutdown) = shutdown::channel();

        trigger.trigger();

        let mut polling_loop =
            PollingLoop::new(&store, &reader, Duration::from_secs(60), shutdown).unwrap();

        let summary = polling_loop.run().await;

        assert_eq!(summary, LoopSummary::default());
        assert_eq!(polling_loop.state(), LoopState::Stopped);
        assert_eq!(reader.reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn it_idles_when_there_are_no_feeds() {
        let store = MemoryStore::default();
        let reader = StaticReader::new(Ok(example_feed()));
        let (trigger, shutdown) = shutdown::channel();

        let mut polling_loop =
            PollingLoop::new(&store, &reader, Duration::from_secs(30), shutdown).unwrap();

        let stop = async {
            time::sleep(Duration::from_secs(45)).await;
            trigger.trigger();
        };

        let (summary, _) = tokio::join!(polling_loop.run(), stop);

        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.failed_cycles, 0);
        assert_eq!(reader.reads(), 0);
    }
}
