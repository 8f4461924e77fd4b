//! Error types / 错误类型
//!
//! Direct API calls surface every failure. Background sync triggered by host
//! operations only logs them (see `interceptor`).

use thiserror::Error;

use crate::host::HostError;

/// Index store failure / 索引存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite index store: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("index store is closed")]
    Closed,

    #[error("index store: {0}")]
    Other(#[from] anyhow::Error),
}

/// Full-text search error / 全文搜索错误
#[derive(Debug, Error)]
pub enum FtsError {
    /// Missing account/appKey and similar construction problems
    #[error("{0}")]
    InvalidConfig(String),

    #[error("full-text search must be created inside a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The query executed but no local message matched / 查询本地消息，无匹配词
    #[error("no local message matches the query")]
    NoMatch,

    #[error(transparent)]
    Host(#[from] HostError),

    /// The host dropped a completion callback without calling it
    #[error("host client dropped the completion callback")]
    HostDisconnected,

    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl FtsError {
    pub fn is_no_match(&self) -> bool {
        matches!(self, FtsError::NoMatch)
    }
}

pub type Result<T> = std::result::Result<T, FtsError>;
