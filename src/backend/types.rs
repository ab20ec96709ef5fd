use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// One user-initiated load: screen open, search submit or search clear.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadRequest {
    pub query: Option<String>,
    pub force_local: bool,
}

impl LoadRequest {
    /// Blank queries are treated as "no query" (the trending feed).
    pub fn new(query: Option<&str>, force_local: bool) -> Self {
        Self {
            query: query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(String::from),
            force_local,
        }
    }
    pub fn trending() -> Self {
        Self::new(None, false)
    }
    pub fn search(query: &str) -> Self {
        Self::new(Some(query), false)
    }
    pub fn local() -> Self {
        Self::new(None, true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub preview: Option<Rendition>,
    pub rating: Option<String>,
}

impl FeedItem {
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

impl From<BlockedEntry> for FeedItem {
    fn from(entry: BlockedEntry) -> Self {
        Self {
            id: entry.id,
            title: String::new(),
            url: None,
            preview: None,
            rating: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockedEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<DateTime<Utc>>,
}

impl BlockedEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            blocked_at: Some(Utc::now()),
        }
    }
}

/// Position in a remote feed. Tokens of one feed are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageToken(pub u32);

impl Display for PageToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub items: Vec<FeedItem>,
    pub next: Option<PageToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Remote,
    Local,
}
