//! Index store interface (primitive operations only) / 索引存储接口
//!
//! Entries sharing an `id` form one document. A document matches a query when
//! every clause matches one of its entries. Stores return one hit per matching
//! document and page over documents; callers still deduplicate by `id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::query::Query;
use crate::error::StoreError;
use crate::models::TokenEntry;

/// One query hit / 查询命中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHit {
    pub id: String,
    pub time: String,
    pub session_id: String,
}

/// Index statistics / 索引统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub entry_count: u64,
    pub message_count: u64,
    pub last_updated: Option<i64>,
}

#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Store name / 索引库名
    fn name(&self) -> &str;

    /// Batched write / 批量写入
    async fn put(&self, entries: &[TokenEntry]) -> Result<(), StoreError>;

    /// Drop every entry of the given ids; unknown ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<IndexHit>, StoreError>;

    /// Empty the whole store / 清空
    async fn flush(&self) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<IndexStats, StoreError>;

    /// Release the underlying resources; later calls fail with `Closed`
    async fn close(&self) -> Result<(), StoreError>;
}
