//! Index sync engine - messages in, token entries out / 索引同步
//!
//! Only applies writes. Deciding *when* a message enters or leaves the index
//! belongs to the lifecycle interceptor.

use std::borrow::Borrow;
use std::sync::Arc;

use super::store::IndexStore;
use super::tokenizer::Tokenizer;
use crate::error::Result;
use crate::logger::DiagLog;
use crate::models::{Message, TokenEntry};

#[derive(Clone)]
pub struct IndexSync {
    store: Arc<dyn IndexStore>,
    tokenizer: Tokenizer,
    log: DiagLog,
}

impl IndexSync {
    pub fn new(store: Arc<dyn IndexStore>, tokenizer: Tokenizer, log: DiagLog) -> Self {
        Self {
            store,
            tokenizer,
            log,
        }
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// One entry per (message, token); messages without text or id are skipped
    pub fn entries_for<I, M>(&self, msgs: I) -> Vec<TokenEntry>
    where
        I: IntoIterator<Item = M>,
        M: Borrow<Message>,
    {
        let mut entries = Vec::new();
        for msg in msgs {
            let msg = msg.borrow();
            if !msg.is_indexable() {
                continue;
            }
            let (Some(id), Some(text)) = (msg.id(), msg.text.as_deref()) else {
                continue;
            };
            entries.extend(
                self.tokenizer
                    .tokenize(text)
                    .into_iter()
                    .map(|token| TokenEntry::new(id, token, msg.time, &msg.session_id)),
            );
        }
        entries
    }

    /// Index one or many messages with a single batched write / 写入索引
    pub async fn index_messages<I, M>(&self, msgs: I) -> Result<()>
    where
        I: IntoIterator<Item = M>,
        M: Borrow<Message>,
    {
        let entries = self.entries_for(msgs);
        if let Err(e) = self.store.put(&entries).await {
            self.log.log(format_args!("index messages failed: {}", e));
            return Err(e.into());
        }
        self.log.log(format_args!("indexed {} token entries", entries.len()));
        Ok(())
    }

    /// Remove every entry of the given ids; unknown ids are a no-op / 删除索引
    pub async fn remove_messages<I, S>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if let Err(e) = self.store.delete(&ids).await {
            self.log.log(format_args!("remove messages failed: {}", e));
            return Err(e.into());
        }
        self.log.log(format_args!("removed index entries of {:?}", ids));
        Ok(())
    }

    /// Empty the whole index / 清空索引
    pub async fn clear_all(&self) -> Result<()> {
        if let Err(e) = self.store.flush().await {
            self.log.log(format_args!("clear index failed: {}", e));
            return Err(e.into());
        }
        self.log.log(format_args!("index cleared"));
        Ok(())
    }
}
