//! Result resolver - index hits back to host messages / 结果解析

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::oneshot;

use super::store::IndexHit;
use crate::error::{FtsError, Result};
use crate::host::HostClient;
use crate::models::Message;

/// Distinct ids in first-seen order / 去重
pub fn distinct_ids(hits: &[IndexHit]) -> Vec<String> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter(|hit| seen.insert(hit.id.as_str()))
        .map(|hit| hit.id.clone())
        .collect()
}

/// Batch lookup through the host callback, awaited as a future
pub async fn lookup_messages(host: &Arc<dyn HostClient>, ids: Vec<String>) -> Result<Vec<Message>> {
    let (tx, rx) = oneshot::channel();
    host.get_local_msgs_by_id_clients(
        ids,
        Box::new(move |res| {
            let _ = tx.send(res);
        }),
    );
    let msgs = rx.await.map_err(|_| FtsError::HostDisconnected)??;
    Ok(msgs)
}

/// Resolve hits to messages. Order follows the host lookup, not the hits.
pub async fn resolve(host: &Arc<dyn HostClient>, hits: &[IndexHit]) -> Result<Vec<Message>> {
    let ids = distinct_ids(hits);
    if ids.is_empty() {
        return Err(FtsError::NoMatch);
    }
    lookup_messages(host, ids).await
}
