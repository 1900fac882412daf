use crate::db;
use crate::db::{FeedStore, InsertOutcome, NewPost};
use crate::models::post::Post;
use crate::sync::reader::FetchedFeedItem;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Created(Post),
    Duplicate,
    Failed(String),
}

/// The parts of a fetched item that become a post. Items without a link
/// can't be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostCandidate<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
}

impl<'a> PostCandidate<'a> {
    pub fn from_item(item: &'a FetchedFeedItem) -> Option<Self> {
        let url = item.link.as_deref().map(str::trim).filter(|url| !url.is_empty())?;

        Some(Self {
            url,
            title: item.title.as_deref().unwrap_or(""),
            description: item.description.as_deref(),
        })
    }
}

pub fn ingest_item<S: FeedStore + ?Sized>(
    store: &S,
    feed_id: Uuid,
    candidate: &PostCandidate<'_>,
    published_at: Option<DateTime<Utc>>,
) -> IngestOutcome {
    let now = db::current_time();

    let new_post = NewPost {
        id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        title: candidate.title.to_string(),
        url: candidate.url.to_string(),
        description: candidate.description.map(|s| s.to_string()),
        published_at,
        feed_id,
    };

    match store.create_post(&new_post) {
        Ok(InsertOutcome::Created(post)) => IngestOutcome::Created(post),
        Ok(InsertOutcome::Duplicate) => {
            log::debug!("Post {} already exists for feed {}", candidate.url, feed_id);

            IngestOutcome::Duplicate
        }
        Err(error) => {
            log::error!(
                "Failed to create post {} for feed {}: {}",
                candidate.url,
                feed_id,
                error
            );

            IngestOutcome::Failed(error.to_string())
        }
    }
}
