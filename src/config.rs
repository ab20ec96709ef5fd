use crate::backend::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub block_list: Option<PathBuf>,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("block_list", &self.block_list)
            .field("offline", &self.offline)
            .field("feed", &self.feed)
            .field("paging", &self.paging)
            .field("connectivity", &self.connectivity)
            .field("layout", &self.layout)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub page_size: u32,
    pub rating: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.giphy.com/v1/gifs"),
            page_size: 25,
            rating: Some(String::from("g")),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PagingConfig {
    pub prefetch_distance: usize,
    pub retry: RetryPolicy,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            prefetch_distance: 4,
            retry: RetryPolicy::SamePage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe: String,
    pub timeout_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe: String::from("api.giphy.com:443"),
            timeout_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub columns: usize,
    pub cell_width: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: 2,
            cell_width: 36,
        }
    }
}
