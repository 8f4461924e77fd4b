//! Instance manager - one full-text handle per identity / 实例管理
//!
//! `Registry` maps (account, appKey) to a shared `FullTextSearch`. Storage is
//! opened on the first `acquire` only; `release` closes it and destroys the host.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Mutex;

use crate::config::FullTextConfig;
use crate::error::{FtsError, Result, StoreError};
use crate::host::{ArrivalEvent, ArrivalHandler, HostClient};
use crate::interceptor::BackgroundSync;
use crate::logger::DiagLog;
use crate::models::{Message, QueryParams};
use crate::search::{
    resolver, translate, IndexStats, IndexStore, IndexSync, SqliteIndexStore, Tokenizer,
};

/// Full-text search handle / 全文搜索实例
pub struct FullTextSearch {
    config: FullTextConfig,
    pub(crate) host: Arc<dyn HostClient>,
    sync: IndexSync,
    pub(crate) background: BackgroundSync,
    log: DiagLog,
}

impl FullTextSearch {
    /// Build a handle over an already opened store. Must run inside a tokio runtime.
    pub fn new(
        config: FullTextConfig,
        host: Arc<dyn HostClient>,
        store: Arc<dyn IndexStore>,
    ) -> Result<Self> {
        let log = config.diag_log();
        if let Err(e) = config.validate() {
            log.log(format_args!("invalid init params!"));
            return Err(e);
        }
        let runtime = Handle::try_current().map_err(|_| FtsError::NoRuntime)?;

        let tokenizer = Tokenizer::new(config.ignore_chars());
        let sync = IndexSync::new(store, tokenizer, log.clone());
        let background = BackgroundSync::new(sync.clone(), runtime, log.clone());

        Ok(Self {
            config,
            host,
            sync,
            background,
            log,
        })
    }

    /// Open the SQLite store named after the config and build a handle
    pub async fn open(config: FullTextConfig, host: Arc<dyn HostClient>) -> Result<Self> {
        config.validate()?;
        let store = Self::open_store(config.clone()).await.map_err(|e| {
            config.diag_log().log(format_args!("open index store failed: {}", e));
            e
        })?;
        Self::new(config, host, store)
    }

    /// Default store opener / 默认索引库
    pub async fn open_store(
        config: FullTextConfig,
    ) -> std::result::Result<Arc<dyn IndexStore>, StoreError> {
        let store = SqliteIndexStore::open(config.store_location()).await?;
        Ok(Arc::new(store))
    }

    pub fn config(&self) -> &FullTextConfig {
        &self.config
    }

    /// Underlying host, for operations that need no decoration
    pub fn host(&self) -> &Arc<dyn HostClient> {
        &self.host
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        self.sync.store()
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        self.sync.tokenizer()
    }

    /// Search local messages / 搜索本地消息
    ///
    /// Fails with `FtsError::NoMatch` when nothing matched. The returned order
    /// is the host lookup's, which need not follow `time_direction`.
    pub async fn query(&self, params: &QueryParams) -> Result<Vec<Message>> {
        let query = translate(params, self.tokenizer());
        if self.log.is_enabled() {
            let rendered = serde_json::to_string(&query).unwrap_or_default();
            self.log.log(format_args!("translated query: {}", rendered));
        }

        let result = match self.store().query(&query).await {
            Ok(hits) => resolver::resolve(&self.host, &hits).await,
            Err(e) => Err(e.into()),
        };
        match &result {
            Ok(msgs) => self.log.log(format_args!("query resolved {} messages", msgs.len())),
            Err(e) => self.log.log(format_args!("query failed: {}", e)),
        }
        result
    }

    /// Index one or many messages / 写入索引
    pub async fn index_messages<I, M>(&self, msgs: I) -> Result<()>
    where
        I: IntoIterator<Item = M>,
        M: std::borrow::Borrow<Message>,
    {
        self.sync.index_messages(msgs).await
    }

    /// Remove one or many indexed messages / 删除索引
    pub async fn remove_messages<I, S>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sync.remove_messages(ids).await
    }

    /// Empty the whole index / 清空索引
    pub async fn clear_all(&self) -> Result<()> {
        self.sync.clear_all().await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(self.store().stats().await?)
    }

    /// Wait until every lifecycle-triggered write started so far has settled
    pub async fn wait_background_sync(&self) {
        self.background.drain().await;
    }

    /// Let in-flight background writes settle, then close the store / 关闭
    pub async fn close(&self) -> Result<()> {
        self.background.drain().await;
        match self.store().close().await {
            Ok(()) => {
                self.log.log(format_args!("close index store success"));
                Ok(())
            }
            Err(e) => {
                self.log.log(format_args!("close index store failed: {}", e));
                Err(e.into())
            }
        }
    }

    /// Index ambient arrivals, then hand the event to the caller's handler unchanged
    pub(crate) fn wire_arrivals(&self, forward: Option<ArrivalHandler>) {
        let background = self.background.clone();
        self.host.set_arrival_handler(Arc::new(move |event: &ArrivalEvent| {
            let op = match event {
                ArrivalEvent::Message(_) => "incoming message",
                ArrivalEvent::Roaming { .. } => "roaming messages",
                ArrivalEvent::Offline { .. } => "offline messages",
            };
            background.index(event.messages().to_vec(), op);
            if let Some(forward) = &forward {
                forward(event);
            }
        }));
    }
}

/// Identity an index handle is keyed by / 实例标识
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub account: String,
    pub app_key: String,
}

impl Identity {
    pub fn new(account: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            app_key: app_key.into(),
        }
    }

    pub fn of(config: &FullTextConfig) -> Self {
        Self::new(config.account.clone(), config.app_key.clone())
    }
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Handle registry / 实例注册表
#[derive(Default)]
pub struct Registry {
    instances: Mutex<HashMap<Identity, Arc<FullTextSearch>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry / 全局注册表
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Get or create the handle for `config`'s identity, backed by SQLite.
    ///
    /// On reuse, `host` is dropped in favour of the existing handle's host.
    /// Arrival forwarding is rewired on every call; the latest handler wins.
    pub async fn acquire(
        &self,
        config: FullTextConfig,
        host: Arc<dyn HostClient>,
        on_arrival: Option<ArrivalHandler>,
    ) -> Result<Arc<FullTextSearch>> {
        self.acquire_with(config, host, on_arrival, FullTextSearch::open_store).await
    }

    /// Like `acquire`, with a custom store opener called only on first acquisition
    pub async fn acquire_with<F, Fut>(
        &self,
        config: FullTextConfig,
        host: Arc<dyn HostClient>,
        on_arrival: Option<ArrivalHandler>,
        open: F,
    ) -> Result<Arc<FullTextSearch>>
    where
        F: FnOnce(FullTextConfig) -> Fut,
        Fut: Future<Output = std::result::Result<Arc<dyn IndexStore>, StoreError>>,
    {
        config.validate()?;
        let identity = Identity::of(&config);

        let mut instances = self.instances.lock().await;
        let instance = match instances.get(&identity) {
            Some(existing) => existing.clone(),
            None => {
                let log = config.diag_log();
                let store = open(config.clone()).await.map_err(|e| {
                    log.log(format_args!("open index store failed: {}", e));
                    e
                })?;
                let instance = match FullTextSearch::new(config, host, store.clone()) {
                    Ok(instance) => Arc::new(instance),
                    Err(e) => {
                        store.close().await.ok();
                        return Err(e);
                    }
                };
                tracing::info!(
                    "Full-text search initialized: {} ({}:{})",
                    instance.store().name(),
                    identity.account,
                    identity.app_key
                );
                instances.insert(identity, instance.clone());
                instance
            }
        };
        instance.wire_arrivals(on_arrival);
        Ok(instance)
    }

    pub async fn get(&self, identity: &Identity) -> Option<Arc<FullTextSearch>> {
        self.instances.lock().await.get(identity).cloned()
    }

    pub async fn len(&self) -> usize {
        self.instances.lock().await.len()
    }

    /// Close the store, destroy the host and forget the handle.
    /// Returns `false` when nothing was registered for `identity`.
    pub async fn release(&self, identity: &Identity) -> Result<bool> {
        let instance = self.instances.lock().await.remove(identity);
        let Some(instance) = instance else {
            return Ok(false);
        };
        let closed = instance.close().await;
        if let Err(e) = &closed {
            tracing::warn!("Closing full-text index store failed: {}", e);
        }
        instance.host().destroy();
        tracing::info!("Full-text search released: {}:{}", identity.account, identity.app_key);
        closed.map(|_| true)
    }
}
