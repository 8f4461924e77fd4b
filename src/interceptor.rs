//! Lifecycle interceptor - keeps the index in step with host operations / 生命周期拦截
//!
//! Each decorated operation forwards its result to the caller's `done`
//! untouched. On success it first schedules one index write as a detached
//! task. The caller is never delayed by that write and never sees its failure,
//! so a query issued right after a send or delete may still see the old index.

use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::error::Result;
use crate::host::{
    DeleteMsgBatchRequest, DeleteMsgRequest, Done, HostError, LocalMsgsQuery, SaveMsgsRequest,
    SendCustomMsgRequest, SendTextRequest,
};
use crate::logger::DiagLog;
use crate::manager::FullTextSearch;
use crate::models::Message;
use crate::search::IndexSync;

/// Detached index writes with their own failure channel / 后台索引同步
#[derive(Clone)]
pub(crate) struct BackgroundSync {
    sync: IndexSync,
    tracker: TaskTracker,
    /// Serializes close/wait/reopen across clones sharing `tracker`
    draining: Arc<Mutex<()>>,
    runtime: Handle,
    log: DiagLog,
}

impl BackgroundSync {
    pub(crate) fn new(sync: IndexSync, runtime: Handle, log: DiagLog) -> Self {
        Self {
            sync,
            tracker: TaskTracker::new(),
            draining: Arc::new(Mutex::new(())),
            runtime,
            log,
        }
    }

    fn spawn<F>(&self, op: &'static str, fut: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let log = self.log.clone();
        self.tracker.spawn_on(
            async move {
                if let Err(e) = fut.await {
                    tracing::warn!("Background index sync failed after {}: {}", op, e);
                    log.log(format_args!("{} index sync failed: {}", op, e));
                }
            },
            &self.runtime,
        );
    }

    pub(crate) fn index(&self, msgs: Vec<Message>, op: &'static str) {
        let sync = self.sync.clone();
        self.spawn(op, async move { sync.index_messages(msgs).await });
    }

    pub(crate) fn remove(&self, ids: Vec<String>, op: &'static str) {
        let sync = self.sync.clone();
        self.spawn(op, async move { sync.remove_messages(ids).await });
    }

    pub(crate) fn clear(&self, op: &'static str) {
        let sync = self.sync.clone();
        self.spawn(op, async move { sync.clear_all().await });
    }

    /// Wait for every task spawned so far, then accept new ones again.
    /// Concurrent drains queue up so one never reopens under another's wait.
    pub(crate) async fn drain(&self) {
        let _guard = self.draining.lock().await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

/// Runs `on_success` on the value before handing the result to `done`
fn decorate<T, F>(done: Done<T>, on_success: F) -> Done<T>
where
    T: Send + 'static,
    F: FnOnce(&T) + Send + 'static,
{
    Box::new(move |res: std::result::Result<T, HostError>| {
        if let Ok(value) = &res {
            on_success(value);
        }
        done(res);
    })
}

fn id_of(msg: &Message) -> Option<String> {
    msg.id().map(str::to_string)
}

impl FullTextSearch {
    /// Send a text message; indexed once the host assigns an id / 发送文本消息
    pub fn send_text(&self, req: SendTextRequest, done: Done<Message>) {
        let background = self.background.clone();
        self.host.send_text(
            req,
            decorate(done, move |msg: &Message| {
                if msg.id().is_some() {
                    background.index(vec![msg.clone()], "send_text");
                }
            }),
        );
    }

    /// Send a custom message / 发送自定义消息
    pub fn send_custom_msg(&self, req: SendCustomMsgRequest, done: Done<Message>) {
        let background = self.background.clone();
        self.host.send_custom_msg(
            req,
            decorate(done, move |msg: &Message| {
                if msg.id().is_some() {
                    background.index(vec![msg.clone()], "send_custom_msg");
                }
            }),
        );
    }

    /// Save messages locally and index everything saved / 保存到本地
    pub fn save_msgs_to_local(&self, req: SaveMsgsRequest, done: Done<Vec<Message>>) {
        let background = self.background.clone();
        self.host.save_msgs_to_local(
            req,
            decorate(done, move |msgs: &Vec<Message>| {
                background.index(msgs.clone(), "save_msgs_to_local");
            }),
        );
    }

    /// Recall a message / 撤回消息
    pub fn delete_msg(&self, req: DeleteMsgRequest, done: Done<()>) {
        let id = id_of(&req.msg);
        let background = self.background.clone();
        self.host.delete_msg(
            req,
            decorate(done, move |_: &()| {
                if let Some(id) = id {
                    background.remove(vec![id], "delete_msg");
                }
            }),
        );
    }

    /// Delete a local message / 删除本地消息
    pub fn delete_local_msg(&self, req: DeleteMsgRequest, done: Done<()>) {
        let id = id_of(&req.msg);
        let background = self.background.clone();
        self.host.delete_local_msg(
            req,
            decorate(done, move |_: &()| {
                if let Some(id) = id {
                    background.remove(vec![id], "delete_local_msg");
                }
            }),
        );
    }

    /// Drop the whole local history, and with it the whole index / 删除全部本地消息
    pub fn delete_all_local_msgs(&self, done: Done<()>) {
        let background = self.background.clone();
        self.host.delete_all_local_msgs(decorate(done, move |_: &()| {
            background.clear("delete_all_local_msgs");
        }));
    }

    /// One-sided delete / 单向删除
    pub fn delete_msg_self(&self, req: DeleteMsgRequest, done: Done<()>) {
        let id = id_of(&req.msg);
        let background = self.background.clone();
        self.host.delete_msg_self(
            req,
            decorate(done, move |_: &()| {
                if let Some(id) = id {
                    background.remove(vec![id], "delete_msg_self");
                }
            }),
        );
    }

    /// One-sided batch delete / 批量单向删除
    pub fn delete_msg_self_batch(&self, req: DeleteMsgBatchRequest, done: Done<()>) {
        let ids: Vec<String> = req.msgs.iter().filter_map(id_of).collect();
        let background = self.background.clone();
        self.host.delete_msg_self_batch(
            req,
            decorate(done, move |_: &()| {
                if !ids.is_empty() {
                    background.remove(ids, "delete_msg_self_batch");
                }
            }),
        );
    }

    /// Fetch local history and index what comes back / 拉取本地消息并建立索引
    pub fn get_local_msgs_to_fts(&self, query: LocalMsgsQuery, done: Done<Vec<Message>>) {
        let background = self.background.clone();
        self.host.get_local_msgs(
            query,
            decorate(done, move |msgs: &Vec<Message>| {
                background.index(msgs.clone(), "get_local_msgs_to_fts");
            }),
        );
    }
}
