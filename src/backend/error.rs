use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote feed returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("block list store failed: {0}")]
    LocalStore(String),
    #[error("no api key configured")]
    MissingApiKey,
}

impl Error {
    /// Remote failures are confined to one page and may be retried.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Decode(_) | Self::MissingApiKey
        )
    }
}
