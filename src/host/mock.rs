//! In-memory host used by the unit tests / 测试用宿主客户端

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::*;

pub(crate) const BASE_TIME: u64 = 1_620_000_000_000;

#[derive(Default)]
pub(crate) struct MockHost {
    msgs: Mutex<Vec<Message>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    destroyed: AtomicBool,
    handler: Mutex<Option<ArrivalHandler>>,
}

impl MockHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every following operation reports a host error
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn stored(&self) -> Vec<Message> {
        self.msgs.lock().clone()
    }

    /// Seeds the local store without going through any host operation
    pub(crate) fn seed(&self, msgs: impl IntoIterator<Item = Message>) {
        self.msgs.lock().extend(msgs);
    }

    /// Fires an ambient arrival as the network layer would
    pub(crate) fn emit(&self, event: ArrivalEvent) {
        for msg in event.messages() {
            self.msgs.lock().push(msg.clone());
        }
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(&event);
        }
    }

    fn check(&self) -> Result<(), HostError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HostError::with_code(500, "mock host failure"));
        }
        Ok(())
    }

    fn create(&self, scene: &str, to: &str, text: String) -> Message {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let msg = Message {
            id_client: Some(format!("c{}", n)),
            text: Some(text),
            time: BASE_TIME + n * 1000,
            session_id: format!("{}-{}", scene, to),
        };
        self.msgs.lock().push(msg.clone());
        msg
    }

    fn remove(&self, ids: &[Option<String>]) {
        self.msgs.lock().retain(|m| !ids.contains(&m.id_client));
    }
}

impl HostClient for MockHost {
    fn send_text(&self, req: SendTextRequest, done: Done<Message>) {
        let res = self.check().map(|_| self.create(&req.scene, &req.to, req.text));
        done(res)
    }

    fn send_custom_msg(&self, req: SendCustomMsgRequest, done: Done<Message>) {
        let res = self.check().map(|_| self.create(&req.scene, &req.to, req.content));
        done(res)
    }

    fn save_msgs_to_local(&self, req: SaveMsgsRequest, done: Done<Vec<Message>>) {
        let res = self.check().map(|_| {
            self.msgs.lock().extend(req.msgs.iter().cloned());
            req.msgs
        });
        done(res)
    }

    fn delete_msg(&self, req: DeleteMsgRequest, done: Done<()>) {
        done(self.check().map(|_| self.remove(&[req.msg.id_client])))
    }

    fn delete_local_msg(&self, req: DeleteMsgRequest, done: Done<()>) {
        done(self.check().map(|_| self.remove(&[req.msg.id_client])))
    }

    fn delete_all_local_msgs(&self, done: Done<()>) {
        done(self.check().map(|_| self.msgs.lock().clear()))
    }

    fn delete_msg_self(&self, req: DeleteMsgRequest, done: Done<()>) {
        done(self.check().map(|_| self.remove(&[req.msg.id_client])))
    }

    fn delete_msg_self_batch(&self, req: DeleteMsgBatchRequest, done: Done<()>) {
        let ids: Vec<_> = req.msgs.into_iter().map(|m| m.id_client).collect();
        done(self.check().map(|_| self.remove(&ids)))
    }

    fn get_local_msgs(&self, query: LocalMsgsQuery, done: Done<Vec<Message>>) {
        let res = self.check().map(|_| {
            let mut msgs: Vec<Message> = self
                .msgs
                .lock()
                .iter()
                .filter(|m| query.session_id.as_ref().map_or(true, |s| &m.session_id == s))
                .cloned()
                .collect();
            if query.desc {
                msgs.reverse();
            }
            if let Some(limit) = query.limit {
                msgs.truncate(limit);
            }
            msgs
        });
        done(res)
    }

    fn get_local_msgs_by_id_clients(&self, ids: Vec<String>, done: Done<Vec<Message>>) {
        // store order, not request order
        let res = self.check().map(|_| {
            self.msgs
                .lock()
                .iter()
                .filter(|m| m.id_client.as_ref().is_some_and(|id| ids.contains(id)))
                .cloned()
                .collect()
        });
        done(res)
    }

    fn set_arrival_handler(&self, handler: ArrivalHandler) {
        *self.handler.lock() = Some(handler);
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}
