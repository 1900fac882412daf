use crate::sync::reader::{
    unescape_html, FeedReaderError, FetchedFeed, FetchedFeedItem, ReadFeed,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rss::Channel;

pub struct RssReader {
    client: Client,
}

impl RssReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn read_from_bytes(&self, data: &[u8]) -> Result<FetchedFeed, FeedReaderError> {
        match Channel::read_from(data) {
            Ok(channel) => Ok(FetchedFeed::from(channel)),
            Err(err) => {
                let msg = format!("{}", err);
                Err(FeedReaderError::Parse { msg })
            }
        }
    }
}

#[async_trait]
impl ReadFeed for RssReader {
    async fn read(&self, url: &str) -> Result<FetchedFeed, FeedReaderError> {
        let request = self
            .client
            .get(url)
            .build()
            .map_err(|err| FeedReaderError::Request {
                msg: format!("{}", err),
            })?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| FeedReaderError::Transport {
                msg: format!("{}", err),
            })?;

        if response.status() != StatusCode::OK {
            return Err(FeedReaderError::Status {
                code: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|err| FeedReaderError::Body {
            msg: format!("{}", err),
        })?;

        self.read_from_bytes(&body)
    }
}

impl From<Channel> for FetchedFeed {
    fn from(channel: Channel) -> Self {
        let title = unescape_html(channel.title());
        let description = unescape_html(channel.description());
        let link = channel.link().to_string();

        let items = channel
            .into_items()
            .into_iter()
            .map(|item| FetchedFeedItem {
                title: item.title().map(unescape_html),
                link: item.link().map(|s| s.trim().to_string()),
                description: item.description().map(unescape_html),
                publication_date: item.pub_date().map(|s| s.to_string()),
            })
            .collect::<Vec<FetchedFeedItem>>();

        FetchedFeed {
            title,
            link,
            description,
            items,
        }
    }
}
