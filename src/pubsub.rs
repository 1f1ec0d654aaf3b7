//! Subscription registry and message fan-out.
//!
//! Everything goes through one process-wide mutex. Delivery to a subscriber
//! happens while it is held, so two publishers can never interleave frames on
//! the same connection and a client that is being removed never receives a
//! message afterwards.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cmd::ReplySink;
use crate::pattern::KeyPattern;
use crate::resp::Resp;

struct PatternSubscribers {
    matcher: KeyPattern,
    clients: HashMap<u64, ReplySink>,
}

#[derive(Default)]
struct Registry {
    channels: HashMap<Bytes, HashMap<u64, ReplySink>>,
    patterns: HashMap<Bytes, PatternSubscribers>,
}

impl Registry {
    fn drop_channel_client(&mut self, channel: &[u8], client: u64) {
        if let Some(clients) = self.channels.get_mut(channel) {
            clients.remove(&client);
            if clients.is_empty() {
                self.channels.remove(channel);
            }
        }
    }

    fn drop_pattern_client(&mut self, pattern: &[u8], client: u64) {
        if let Some(subs) = self.patterns.get_mut(pattern) {
            subs.clients.remove(&client);
            if subs.clients.is_empty() {
                self.patterns.remove(pattern);
            }
        }
    }
}

#[derive(Default)]
pub struct PubSub {
    registry: Mutex<Registry>,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, channel: Bytes, client: u64, sink: &ReplySink) {
        self.lock()
            .channels
            .entry(channel)
            .or_default()
            .insert(client, sink.clone());
    }

    pub fn unsubscribe(&self, channel: &[u8], client: u64) {
        self.lock().drop_channel_client(channel, client);
    }

    pub fn psubscribe(&self, pattern: Bytes, client: u64, sink: &ReplySink) {
        let mut registry = self.lock();
        let subs = registry
            .patterns
            .entry(pattern.clone())
            .or_insert_with(|| PatternSubscribers {
                matcher: KeyPattern::compile(&pattern),
                clients: HashMap::new(),
            });
        subs.clients.insert(client, sink.clone());
    }

    pub fn punsubscribe(&self, pattern: &[u8], client: u64) {
        self.lock().drop_pattern_client(pattern, client);
    }

    /// Forgets every subscription of a disconnecting client.
    pub fn remove_client<'a>(
        &self,
        client: u64,
        channels: impl IntoIterator<Item = &'a Bytes>,
        patterns: impl IntoIterator<Item = &'a Bytes>,
    ) {
        let mut registry = self.lock();
        for channel in channels {
            registry.drop_channel_client(channel, client);
        }
        for pattern in patterns {
            registry.drop_pattern_client(pattern, client);
        }
    }

    /// Delivers `message` to channel and pattern subscribers. Returns how
    /// many deliveries succeeded.
    pub fn publish(&self, channel: &[u8], message: &Bytes) -> usize {
        let registry = self.lock();
        let channel = Bytes::copy_from_slice(channel);
        let mut delivered = 0;

        if let Some(clients) = registry.channels.get(&channel) {
            for sink in clients.values() {
                let frame = Resp::array(vec![
                    Resp::bulk(Bytes::from_static(b"message")),
                    Resp::bulk(channel.clone()),
                    Resp::bulk(message.clone()),
                ]);
                if sink.send(frame) {
                    delivered += 1;
                }
            }
        }

        for (pattern, subs) in registry.patterns.iter() {
            if !subs.matcher.matches(&channel) {
                continue;
            }
            for sink in subs.clients.values() {
                let frame = Resp::array(vec![
                    Resp::bulk(Bytes::from_static(b"pmessage")),
                    Resp::bulk(pattern.clone()),
                    Resp::bulk(channel.clone()),
                    Resp::bulk(message.clone()),
                ]);
                if sink.send(frame) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Channels with at least one subscriber, optionally filtered, sorted.
    pub fn channels(&self, pattern: Option<&KeyPattern>) -> Vec<Bytes> {
        let registry = self.lock();
        let mut names: Vec<Bytes> = registry
            .channels
            .keys()
            .filter(|c| pattern.is_none_or(|p| p.matches(c)))
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn numsub(&self, channel: &[u8]) -> usize {
        self.lock().channels.get(channel).map_or(0, |c| c.len())
    }

    /// Number of distinct patterns with subscribers.
    pub fn numpat(&self) -> usize {
        self.lock().patterns.len()
    }
}
