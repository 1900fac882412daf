use crate::db::{FeedStore, InsertOutcome, NewPost, StoreError};
use crate::models::feed::Feed;
use crate::models::post::Post;
use crate::sync::reader::{FeedReaderError, FetchedFeed, ReadFeed};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rss::Channel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub fn feed(url: &str, last_fetched_at: Option<DateTime<Utc>>) -> Feed {
    let created_at = Utc::now() - Duration::days(1);

    Feed {
        id: Uuid::new_v4(),
        created_at,
        updated_at: created_at,
        name: url.to_string(),
        url: url.to_string(),
        user_id: Uuid::nil(),
        last_fetched_at,
    }
}

pub fn example_feed() -> FetchedFeed {
    let xml = std::fs::read_to_string("./tests/support/rss_feed_example.xml").unwrap();

    Channel::read_from(xml.as_bytes()).unwrap().into()
}

/// Keeps feeds and posts in memory and enforces the `(feed_id, url)`
/// uniqueness of posts like the database does.
#[derive(Default)]
pub struct MemoryStore {
    feeds: Mutex<Vec<Feed>>,
    posts: Mutex<Vec<Post>>,
    claims: Mutex<Vec<Uuid>>,
}

impl MemoryStore {
    pub fn with_feeds(feeds: Vec<Feed>) -> Self {
        Self {
            feeds: Mutex::new(feeds),
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    pub fn claims(&self) -> Vec<Uuid> {
        self.claims.lock().unwrap().clone()
    }

    pub fn feed(&self, id: Uuid) -> Option<Feed> {
        self.feeds
            .lock()
            .unwrap()
            .iter()
            .find(|feed| feed.id == id)
            .cloned()
    }
}

impl FeedStore for MemoryStore {
    fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError> {
        let feeds = self.feeds.lock().unwrap();

        Ok(feeds
            .iter()
            .min_by_key(|feed| (feed.last_fetched_at, feed.created_at, feed.id))
            .cloned())
    }

    fn mark_feed_fetched(
        &self,
        feed_id: Uuid,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut feeds = self.feeds.lock().unwrap();

        if let Some(feed) = feeds.iter_mut().find(|feed| feed.id == feed_id) {
            feed.last_fetched_at = Some(fetched_at);
            feed.updated_at = fetched_at;
        }

        self.claims.lock().unwrap().push(feed_id);

        Ok(())
    }

    fn create_post(&self, new_post: &NewPost) -> Result<InsertOutcome, StoreError> {
        let mut posts = self.posts.lock().unwrap();

        if posts
            .iter()
            .any(|post| post.feed_id == new_post.feed_id && post.url == new_post.url)
        {
            return Ok(InsertOutcome::Duplicate);
        }

        let post = Post {
            id: new_post.id,
            created_at: new_post.created_at,
            updated_at: new_post.updated_at,
            title: new_post.title.clone(),
            url: new_post.url.clone(),
            description: new_post.description.clone(),
            published_at: new_post.published_at,
            feed_id: new_post.feed_id,
        };

        posts.push(post.clone());

        Ok(InsertOutcome::Created(post))
    }

    fn find_feed_by_url(&self, url: &str) -> Result<Option<Feed>, StoreError> {
        Ok(self
            .feeds
            .lock()
            .unwrap()
            .iter()
            .find(|feed| feed.url == url)
            .cloned())
    }
}

/// Serves the same document for every url and counts reads.
pub struct StaticReader {
    result: Result<FetchedFeed, FeedReaderError>,
    urls: Mutex<Vec<String>>,
    reads: AtomicUsize,
}

impl StaticReader {
    pub fn new(result: Result<FetchedFeed, FeedReaderError>) -> Self {
        Self {
            result,
            urls: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReadFeed for StaticReader {
    async fn read(&self, url: &str) -> Result<FetchedFeed, FeedReaderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        self.result.clone()
    }
}
