// Queue Registry - declared queues and their per-queue resources

use super::producer::SharedInbound;
use super::shutdown::ShutdownSender;
use super::stats::{QueueStats, QueueStatsSnapshot};
use crate::domain::{QueueDescriptor, QueueName};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything owned on behalf of one declared queue
pub(crate) struct QueueEntry {
    pub(crate) descriptor: QueueDescriptor,
    pub(crate) buffer: mpsc::Sender<String>,
    /// Receiving end, held here so the buffer outlives an empty producer pool
    pub(crate) inbound: SharedInbound,
    pub(crate) capacity: usize,
    pub(crate) producers: Vec<JoinHandle<()>>,
    pub(crate) consumers: Vec<JoinHandle<()>>,
    pub(crate) stop: ShutdownSender,
    pub(crate) stats: Arc<QueueStats>,
}

impl QueueEntry {
    fn info(&self) -> QueueInfo {
        QueueInfo {
            name: self.descriptor.name.clone(),
            declared: self.descriptor.declared,
            producers: self.producers.len(),
            consumers: self.consumers.len(),
            active_units: self
                .producers
                .iter()
                .chain(self.consumers.iter())
                .filter(|h| !h.is_finished())
                .count(),
            buffered: self.capacity - self.buffer.capacity(),
            capacity: self.capacity,
            stats: self.stats.snapshot(),
        }
    }
}

/// Observable state of one declared queue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueInfo {
    pub name: QueueName,
    pub declared: bool,
    /// Producer units spawned at declaration
    pub producers: usize,
    /// Consumer units spawned at declaration
    pub consumers: usize,
    /// Units whose task has not finished
    pub active_units: usize,
    /// Payloads waiting in the inbound buffer
    pub buffered: usize,
    pub capacity: usize,
    pub stats: QueueStatsSnapshot,
}

/// Name -> entry map. Writes happen only under the manager's declaration
/// lock; lookups never wait on a declaration in progress.
#[derive(Default)]
pub(crate) struct QueueRegistry {
    entries: RwLock<HashMap<QueueName, QueueEntry>>,
}

impl QueueRegistry {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub(crate) fn insert(&self, entry: QueueEntry) {
        let name = entry.descriptor.name.clone();
        self.write().insert(name, entry);
    }

    /// Buffer sender and counters for a declared queue
    pub(crate) fn sender_for(
        &self,
        name: &str,
    ) -> Option<(mpsc::Sender<String>, Arc<QueueStats>)> {
        self.read()
            .get(name)
            .map(|e| (e.buffer.clone(), Arc::clone(&e.stats)))
    }

    pub(crate) fn info(&self, name: &str) -> Option<QueueInfo> {
        self.read().get(name).map(QueueEntry::info)
    }

    /// All queues, ordered by name
    pub(crate) fn infos(&self) -> Vec<QueueInfo> {
        let mut infos: Vec<QueueInfo> = self.read().values().map(QueueEntry::info).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Remove and return every entry (teardown)
    pub(crate) fn drain(&self) -> Vec<QueueEntry> {
        self.write().drain().map(|(_, entry)| entry).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<QueueName, QueueEntry>> {
        // A panic while holding the lock cannot leave the map half-written
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<QueueName, QueueEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
