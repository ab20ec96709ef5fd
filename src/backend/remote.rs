use super::error::{Error, Result};
use super::types::{FeedItem, Page, PageToken, Rendition};
use crate::config::FeedConfig;
use reqwest::{Client, Request};
use serde::{Deserialize, Deserializer};
use std::future::Future;
use std::time::Duration;

/// Giphy rejects offsets beyond this value.
const MAX_OFFSET: u32 = 4999;

/// Paginated source of feed items. `query` of `None` is the trending feed.
pub trait RemoteFeed {
    fn fetch_page(
        &self,
        query: Option<&str>,
        token: Option<PageToken>,
    ) -> impl Future<Output = Result<Page>> + Send;
}

pub struct GiphyClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    page_size: u32,
    rating: Option<String>,
}

impl GiphyClient {
    /// Without an api key every fetch fails with [`Error::MissingApiKey`].
    pub fn new(config: &FeedConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            rating: config.rating.clone(),
        })
    }
    fn request(&self, query: Option<&str>, token: Option<PageToken>) -> Result<Request> {
        let api_key = self.api_key.as_deref().ok_or(Error::MissingApiKey)?;
        let offset = token.map_or(0, |t| t.0).to_string();
        let limit = self.page_size.to_string();
        let mut params = vec![
            ("api_key", api_key),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];
        if let Some(rating) = &self.rating {
            params.push(("rating", rating.as_str()));
        }
        let endpoint = match query {
            Some(q) => {
                params.push(("q", q));
                "search"
            }
            None => "trending",
        };
        Ok(self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(&params)
            .build()?)
    }
}

impl RemoteFeed for GiphyClient {
    fn fetch_page(
        &self,
        query: Option<&str>,
        token: Option<PageToken>,
    ) -> impl Future<Output = Result<Page>> + Send {
        let request = self.request(query, token);
        let client = self.client.clone();
        async move {
            let request = request?;
            log::debug!("GET {}", request.url().path());
            let response = client.execute(request).await?;
            let status = response.status();
            let body = response.bytes().await?;
            if !status.is_success() {
                let message = serde_json::from_slice::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.message.or(b.meta.and_then(|m| m.msg)))
                    .unwrap_or_else(|| status.to_string());
                return Err(Error::Status {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(serde_json::from_slice::<Response>(&body)?.into_page())
        }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    data: Vec<Gif>,
    pagination: Pagination,
}

impl Response {
    fn into_page(self) -> Page {
        let next = self.pagination.next_token();
        log::debug!(
            "fetched {} items at offset {}",
            self.data.len(),
            self.pagination.offset
        );
        Page {
            items: self.data.into_iter().map(FeedItem::from).collect(),
            next,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total_count: Option<u32>,
    count: u32,
    #[serde(default)]
    offset: u32,
}

impl Pagination {
    fn next_token(&self) -> Option<PageToken> {
        if self.count == 0 {
            return None;
        }
        let next = self.offset.checked_add(self.count)?;
        if self.total_count.is_some_and(|total| next >= total) || next > MAX_OFFSET {
            return None;
        }
        Some(PageToken(next))
    }
}

#[derive(Debug, Deserialize)]
struct Gif {
    id: String,
    #[serde(default)]
    title: String,
    url: Option<String>,
    rating: Option<String>,
    #[serde(default)]
    images: Images,
}

#[derive(Debug, Default, Deserialize)]
struct Images {
    fixed_width: Option<Image>,
    original: Option<Image>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
    #[serde(default, deserialize_with = "number_string")]
    width: u32,
    #[serde(default, deserialize_with = "number_string")]
    height: u32,
}

impl From<Gif> for FeedItem {
    fn from(gif: Gif) -> Self {
        let preview = gif
            .images
            .fixed_width
            .or(gif.images.original)
            .map(|image| Rendition {
                url: image.url,
                width: image.width,
                height: image.height,
            });
        Self {
            id: gif.id,
            title: gif.title,
            url: gif.url,
            preview,
            rating: gif.rating.filter(|r| !r.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    msg: Option<String>,
}

/// Giphy encodes dimensions as strings ("200").
fn number_string<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Value {
        Number(u32),
        String(String),
    }
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n),
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
