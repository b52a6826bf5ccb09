use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::ProcessEvent;

const CHANNEL_CAPACITY: usize = 256;

/// A per-process broadcast registry: every [`super::AgentProcess`] gets its
/// own `broadcast` channel, looked up by process id, so a subscriber can
/// follow one process without seeing another's traffic.
///
/// Grounded directly on `mofa-kernel::bus::AgentBus`'s
/// `Arc<RwLock<HashMap<AgentId, _>>>`-keyed-channel-registry shape, simplified
/// from that module's general pub/sub (point-to-point, topic, broadcast,
/// wire-serialized-to-`Vec<u8>`) down to what this runtime actually needs: one
/// broadcast channel per process, carrying typed [`ProcessEvent`] values
/// directly since everything stays in-process (no `bincode` wire layer).
#[derive(Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<ProcessEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `process_id` and returns a receiver for it. Safe to call
    /// more than once for the same id; each call gets an independent
    /// receiver over the same channel.
    pub fn subscribe(&self, process_id: Uuid) -> broadcast::Receiver<ProcessEvent> {
        let mut channels = self.channels.write().expect("event bus lock poisoned");
        channels
            .entry(process_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes `event` to its own process's channel. A no-op (not an
    /// error) if nobody is subscribed — events are fire-and-forget telemetry,
    /// not a delivery-guaranteed mailbox.
    pub fn publish(&self, event: ProcessEvent) {
        let process_id = event.process_id();
        let sender = {
            let mut channels = self.channels.write().expect("event bus lock poisoned");
            channels
                .entry(process_id)
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .clone()
        };
        let _ = sender.send(event);
    }

    /// Drops a process's channel once it has reached a terminal state and no
    /// further events will be published for it.
    pub fn retire(&self, process_id: Uuid) {
        self.channels
            .write()
            .expect("event bus lock poisoned")
            .remove(&process_id);
    }
}
