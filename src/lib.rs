pub mod config;
pub mod error;
pub mod host;
mod interceptor;
pub mod logger;
pub mod manager;
pub mod models;
pub mod search;

// Common entry points / 常用类型
pub use config::FullTextConfig;
pub use error::{FtsError, Result, StoreError};
pub use host::{
    ArrivalEvent, ArrivalHandler, DeleteMsgBatchRequest, DeleteMsgRequest, Done, HostClient,
    HostError, LocalMsgsQuery, SaveMsgsRequest, SendCustomMsgRequest, SendTextRequest,
};
pub use logger::{DiagLog, LogSink};
pub use manager::{FullTextSearch, Identity, Registry};
pub use models::{Direction, Logic, Message, QueryParams, TokenEntry};
pub use search::{IndexHit, IndexStats, IndexStore, MemoryIndexStore, SqliteIndexStore, Tokenizer};
