pub mod rss;

use async_trait::async_trait;
use thiserror::Error;

pub use self::rss::RssReader;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedReaderError {
    #[error("failed to build request: {msg}")]
    Request { msg: String },
    #[error("failed to fetch feed: {msg}")]
    Transport { msg: String },
    #[error("unexpected status code: {code}")]
    Status { code: u16 },
    #[error("failed to read response body: {msg}")]
    Body { msg: String },
    #[error("failed to parse feed: {msg}")]
    Parse { msg: String },
}

/// One `<item>` as it appears in the document. Nothing is validated here.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FetchedFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub publication_date: Option<String>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FetchedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<FetchedFeedItem>,
}

#[async_trait]
pub trait ReadFeed: Send + Sync {
    async fn read(&self, url: &str) -> Result<FetchedFeed, FeedReaderError>;
}

/// Decodes HTML entities left in text after XML decoding. Feeds often
/// encode entities twice. Each `&name;` or `&#num;` run is decoded on its
/// own; bare ampersands and unknown entities are kept as they are.
pub fn unescape_html(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        unescaped.push_str(&rest[..start]);
        rest = &rest[start..];

        match entity_len(rest) {
            Some(len) => {
                let entity = &rest[..len];

                match htmlescape::decode_html(entity) {
                    Ok(decoded) => unescaped.push_str(&decoded),
                    Err(_) => unescaped.push_str(entity),
                }

                rest = &rest[len..];
            }
            None => {
                unescaped.push('&');
                rest = &rest[1..];
            }
        }
    }

    unescaped.push_str(rest);

    unescaped
}

// length of the entity at the start of `text`, `&` and `;` included
fn entity_len(text: &str) -> Option<usize> {
    let body = &text[1..];
    let end = body.find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))?;

    if end == 0 || !body[end..].starts_with(';') {
        return None;
    }

    Some(end + 2)
}
