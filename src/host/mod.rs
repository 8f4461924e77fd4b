//! Host messaging client seam / 宿主 IM 客户端接口
//!
//! The full-text layer holds an `Arc<dyn HostClient>` and decorates the
//! completion callbacks of the operations that create or remove messages.
//! Operations complete through a `Done` callback, possibly on another thread.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::models::Message;

#[cfg(test)]
pub(crate) mod mock;

/// Completion callback / 完成回调
pub type Done<T> = Box<dyn FnOnce(Result<T, HostError>) + Send + 'static>;

/// Receiver of messages arriving outside any direct call / 消息到达回调
pub type ArrivalHandler = Arc<dyn Fn(&ArrivalEvent) + Send + Sync>;

/// Failure reported by the host client / 宿主客户端错误
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("host client error{}: {message}", code.map(|c| format!(" {}", c)).unwrap_or_default())]
pub struct HostError {
    pub code: Option<i64>,
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Ambient message arrival / 被动收到的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrivalEvent {
    /// Live incoming message / 在线消息
    Message(Message),
    /// Roaming history for one session / 漫游消息
    Roaming {
        session_id: String,
        msgs: Vec<Message>,
    },
    /// Offline history for one session / 离线消息
    Offline {
        session_id: String,
        msgs: Vec<Message>,
    },
}

impl ArrivalEvent {
    pub fn messages(&self) -> &[Message] {
        match self {
            ArrivalEvent::Message(msg) => std::slice::from_ref(msg),
            ArrivalEvent::Roaming { msgs, .. } | ArrivalEvent::Offline { msgs, .. } => msgs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextRequest {
    pub scene: String,
    pub to: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCustomMsgRequest {
    pub scene: String,
    pub to: String,
    /// Serialized custom payload / 自定义消息内容
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMsgsRequest {
    pub msgs: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMsgRequest {
    pub msg: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl DeleteMsgRequest {
    pub fn new(msg: Message) -> Self {
        Self { msg, custom: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMsgBatchRequest {
    pub msgs: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

/// Local history lookup / 本地消息查询
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalMsgsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub desc: bool,
}

/// Capabilities the host messaging client must provide / 宿主客户端能力
pub trait HostClient: Send + Sync {
    fn send_text(&self, req: SendTextRequest, done: Done<Message>);

    fn send_custom_msg(&self, req: SendCustomMsgRequest, done: Done<Message>);

    /// Persist messages to the local store, yielding what was saved
    fn save_msgs_to_local(&self, req: SaveMsgsRequest, done: Done<Vec<Message>>);

    /// Recall a message for both sides / 撤回消息
    fn delete_msg(&self, req: DeleteMsgRequest, done: Done<()>);

    fn delete_local_msg(&self, req: DeleteMsgRequest, done: Done<()>);

    fn delete_all_local_msgs(&self, done: Done<()>);

    /// One-sided delete / 单向删除
    fn delete_msg_self(&self, req: DeleteMsgRequest, done: Done<()>);

    fn delete_msg_self_batch(&self, req: DeleteMsgBatchRequest, done: Done<()>);

    fn get_local_msgs(&self, query: LocalMsgsQuery, done: Done<Vec<Message>>);

    /// Batch lookup by identifier; order of the result is up to the host
    fn get_local_msgs_by_id_clients(&self, ids: Vec<String>, done: Done<Vec<Message>>);

    /// Replaces the receiver of incoming, roaming and offline messages
    fn set_arrival_handler(&self, handler: ArrivalHandler);

    fn destroy(&self) {}
}
