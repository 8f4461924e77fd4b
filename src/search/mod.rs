//! Search module - tokenizing, index writes, query translation, resolving / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Index stores only expose primitives: put, delete, query, flush, close
//! - The lifecycle layer decides when to index; this module only applies writes
//! - Call direction: interceptor → sync → store; query → translate → store → resolve

pub mod memory_store;
pub mod query;
pub mod resolver;
pub mod sqlite_store;
pub mod store;
pub mod sync;
pub mod tokenizer;

pub use memory_store::MemoryIndexStore;
pub use query::{translate, Clause, Field, FieldMatch, Page, Query, QueryOptions, RangeClause, Sort};
pub use sqlite_store::SqliteIndexStore;
pub use store::{IndexHit, IndexStats, IndexStore};
pub use sync::IndexSync;
pub use tokenizer::{JiebaSegmenter, Segmenter, Tokenizer};
