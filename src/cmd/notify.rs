use crate::cmd::ServerContext;
use crate::pubsub::PubSub;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub const EVENT_SET: &str = "set";
pub const EVENT_DEL: &str = "del";
pub const EVENT_EXPIRE: &str = "expire";
pub const EVENT_RENAME_FROM: &str = "rename_from";
pub const EVENT_RENAME_TO: &str = "rename_to";

/// `__keyspace@<db>__:<key>`, key bytes copied verbatim.
pub fn keyspace_channel(db_index: usize, key: &[u8]) -> Bytes {
    let prefix = format!("__keyspace@{}__:", db_index);
    let mut channel = BytesMut::with_capacity(prefix.len() + key.len());
    channel.put_slice(prefix.as_bytes());
    channel.put_slice(key);
    channel.freeze()
}

/// Delivers keyspace events on a single background task, so subscribers see
/// them in the order the commands produced them.
pub struct KeyspaceNotifier {
    tx: Option<mpsc::UnboundedSender<(Bytes, Bytes)>>,
    pubsub: Arc<PubSub>,
}

impl KeyspaceNotifier {
    /// Outside a runtime there is no task and events are published inline.
    pub fn start(pubsub: Arc<PubSub>) -> Self {
        let tx = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let (tx, mut rx) = mpsc::unbounded_channel::<(Bytes, Bytes)>();
            let pubsub = pubsub.clone();
            handle.spawn(async move {
                while let Some((channel, message)) = rx.recv().await {
                    pubsub.publish(&channel, &message);
                }
                debug!("keyspace notifier stopped");
            });
            tx
        });
        Self { tx, pubsub }
    }

    pub fn publish(&self, channel: Bytes, message: Bytes) {
        let pending = match &self.tx {
            Some(tx) => match tx.send((channel, message)) {
                Ok(()) => return,
                Err(mpsc::error::SendError(pending)) => pending,
            },
            None => (channel, message),
        };
        // The task is gone with its runtime.
        self.pubsub.publish(&pending.0, &pending.1);
    }
}

/// Publishes `event` on the key's keyspace channel. Inside a runtime the
/// delivery happens on the notifier task so the caller's reply goes out first.
pub fn notify_keyspace_event(server_ctx: &ServerContext, db_index: usize, key: &[u8], event: &'static str) {
    let channel = keyspace_channel(db_index, key);
    server_ctx.notifier.publish(channel, Bytes::from_static(event.as_bytes()));
}
