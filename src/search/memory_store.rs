//! In-memory index store - inverted index over token entries / 内存索引
//!
//! Used for tests and for sessions that do not need persistence.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::query::{Clause, Field, FieldMatch, Query};
use super::store::{IndexHit, IndexStats, IndexStore};
use crate::error::StoreError;
use crate::models::{Direction, TokenEntry};

/// All entries of one message / 单条消息的全部条目
#[derive(Debug, Clone)]
struct Document {
    time: String,
    session_id: String,
    tokens: HashSet<String>,
    /// Insertion order, used when no sort is requested
    seq: u64,
}

impl Document {
    fn field_matches(&self, m: &FieldMatch) -> bool {
        match m.field {
            Field::Token => self.tokens.contains(&m.value),
            Field::SessionId => self.session_id == m.value,
            Field::Time => self.time == m.value,
        }
    }

    fn matches(&self, clause: &Clause) -> bool {
        match clause {
            Clause::Match(m) => self.field_matches(m),
            Clause::Any(ms) => ms.iter().any(|m| self.field_matches(m)),
            Clause::Range(range) => match range.field {
                Field::Time => range.contains(&self.time),
                Field::SessionId => range.contains(&self.session_id),
                Field::Token => self.tokens.iter().any(|t| range.contains(t)),
            },
        }
    }
}

/// In-memory index store / 内存索引存储
pub struct MemoryIndexStore {
    name: String,
    /// Documents: id -> Document / 文档存储
    documents: RwLock<HashMap<String, Document>>,
    /// Inverted index: token -> ids / 倒排索引
    inverted_index: RwLock<HashMap<String, HashSet<String>>>,
    last_updated: Mutex<Option<i64>>,
    seq: AtomicU64,
    closed: AtomicBool,
}

impl MemoryIndexStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(HashMap::new()),
            inverted_index: RwLock::new(HashMap::new()),
            last_updated: Mutex::new(None),
            seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn touch(&self) {
        *self.last_updated.lock() = Some(chrono::Utc::now().timestamp());
    }

    /// Ids that can possibly match, narrowed by the first mandatory token
    fn candidates(&self, query: &Query) -> Option<HashSet<String>> {
        let token = query.search.iter().find_map(|clause| match clause {
            Clause::Match(m) if m.field == Field::Token => Some(&m.value),
            _ => None,
        })?;
        let index = self.inverted_index.read();
        Some(index.get(token).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, entries: &[TokenEntry]) -> Result<(), StoreError> {
        self.ensure_open()?;
        {
            let mut docs = self.documents.write();
            let mut index = self.inverted_index.write();
            for entry in entries {
                let doc = docs.entry(entry.id.clone()).or_insert_with(|| Document {
                    time: entry.time.clone(),
                    session_id: entry.session_id.clone(),
                    tokens: HashSet::new(),
                    seq: self.seq.fetch_add(1, Ordering::SeqCst),
                });
                doc.time = entry.time.clone();
                doc.session_id = entry.session_id.clone();
                doc.tokens.insert(entry.token.clone());
                index.entry(entry.token.clone()).or_default().insert(entry.id.clone());
            }
        }
        self.touch();
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        self.ensure_open()?;
        {
            let mut docs = self.documents.write();
            let mut index = self.inverted_index.write();
            for id in ids {
                let Some(doc) = docs.remove(id) else {
                    continue;
                };
                for token in &doc.tokens {
                    if let Some(postings) = index.get_mut(token) {
                        postings.remove(id);
                        if postings.is_empty() {
                            index.remove(token);
                        }
                    }
                }
            }
        }
        self.touch();
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<IndexHit>, StoreError> {
        self.ensure_open()?;
        let candidates = self.candidates(query);
        let docs = self.documents.read();

        let mut matched: Vec<(&String, &Document)> = docs
            .iter()
            .filter(|(id, _)| candidates.as_ref().map_or(true, |c| c.contains(*id)))
            .filter(|(_, doc)| query.search.iter().all(|clause| doc.matches(clause)))
            .collect();

        match query.options.sort {
            Some(sort) => {
                matched.sort_by_key(|(_, doc)| doc.time.parse::<u64>().unwrap_or(u64::MAX));
                if sort.direction == Direction::Descending {
                    matched.reverse();
                }
            }
            None => matched.sort_by_key(|(_, doc)| doc.seq),
        }

        // one hit per message, so the page counts messages
        let page = query.options.page;
        let hits = matched
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .map(|(id, doc)| IndexHit {
                id: id.clone(),
                time: doc.time.clone(),
                session_id: doc.session_id.clone(),
            })
            .collect();
        Ok(hits)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.documents.write().clear();
        self.inverted_index.write().clear();
        self.touch();
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        self.ensure_open()?;
        let docs = self.documents.read();
        Ok(IndexStats {
            entry_count: docs.values().map(|d| d.tokens.len() as u64).sum(),
            message_count: docs.len() as u64,
            last_updated: *self.last_updated.lock(),
        })
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::{Page, QueryOptions, RangeClause, Sort};

    fn entry(id: &str, token: &str, time: u64, session: &str) -> TokenEntry {
        TokenEntry::new(id, token.to_string(), time, session)
    }

    fn query(search: Vec<Clause>) -> Query {
        Query {
            search,
            options: QueryOptions {
                page: Page {
                    number: 0,
                    size: 100,
                },
                sort: None,
            },
        }
    }

    fn ids(hits: &[IndexHit]) -> Vec<&str> {
        hits.iter().map(|h| h.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_put_query_delete() {
        let store = MemoryIndexStore::new("test");
        store
            .put(&[
                entry("m1", "hello", 1, "p2p-a"),
                entry("m1", "world", 1, "p2p-a"),
                entry("m2", "hello", 2, "p2p-b"),
            ])
            .await
            .unwrap();

        let q = query(vec![Clause::Match(FieldMatch::token("hello"))]);
        let hits = store.query(&q).await.unwrap();
        assert_eq!(ids(&hits), vec!["m1", "m2"]);

        store.delete(&["m1".to_string(), "ghost".to_string()]).await.unwrap();
        let q = query(vec![Clause::Match(FieldMatch::token("world"))]);
        let hits = store.query(&q).await.unwrap();
        assert!(hits.is_empty());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.message_count, 1);
        assert_eq!(stats.entry_count, 1);
        assert!(stats.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_one_hit_per_message() {
        let store = MemoryIndexStore::new("test");
        store
            .put(&[entry("m1", "x", 1, "s"), entry("m1", "y", 1, "s")])
            .await
            .unwrap();
        let q = query(vec![Clause::Any(vec![FieldMatch::token("x"), FieldMatch::token("y")])]);
        assert_eq!(ids(&store.query(&q).await.unwrap()), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_page_size_counts_messages() {
        let store = MemoryIndexStore::new("test");
        for (id, time) in [("m1", 1), ("m2", 2), ("m3", 3)] {
            store
                .put(&[entry(id, "x", time, "s"), entry(id, "y", time, "s")])
                .await
                .unwrap();
        }
        let mut q = query(vec![
            Clause::Match(FieldMatch::token("x")),
            Clause::Match(FieldMatch::token("y")),
        ]);
        q.options.page.size = 2;
        assert_eq!(ids(&store.query(&q).await.unwrap()), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_empty_any_matches_nothing() {
        let store = MemoryIndexStore::new("test");
        store.put(&[entry("m1", "x", 1, "s")]).await.unwrap();
        assert!(store.query(&query(vec![Clause::nothing()])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_range_and_sort() {
        let store = MemoryIndexStore::new("test");
        store
            .put(&[
                entry("m1", "x", 30, "s"),
                entry("m2", "x", 10, "s"),
                entry("m3", "x", 20, "s"),
            ])
            .await
            .unwrap();

        let mut q = query(vec![
            Clause::Match(FieldMatch::token("x")),
            Clause::Range(RangeClause {
                field: Field::Time,
                gte: Some(crate::models::pad_time(15)),
                lte: None,
            }),
        ]);
        q.options.sort = Some(Sort {
            direction: Direction::Ascending,
            field: Field::Time,
        });
        assert_eq!(ids(&store.query(&q).await.unwrap()), vec!["m3", "m1"]);

        q.options.sort = Some(Sort {
            direction: Direction::Descending,
            field: Field::Time,
        });
        q.options.page.size = 1;
        assert_eq!(ids(&store.query(&q).await.unwrap()), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_flush_and_close() {
        let store = MemoryIndexStore::new("test");
        store.put(&[entry("m1", "x", 1, "s")]).await.unwrap();
        store.flush().await.unwrap();
        assert_eq!(store.stats().await.unwrap().message_count, 0);

        store.close().await.unwrap();
        assert!(matches!(store.put(&[]).await, Err(StoreError::Closed)));
    }
}
