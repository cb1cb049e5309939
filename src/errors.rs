use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no '{0}' in .env")]
    Missing(String),
    #[error("invalid value for '{var}': {value:?}")]
    Invalid { var: String, value: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to the indexer failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("indexer returned errors: {0}")]
    Graph(String),
    #[error("indexer response had no data")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram api returned status {0}")]
    Telegram(reqwest::StatusCode),
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build email: {0}")]
    Email(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
