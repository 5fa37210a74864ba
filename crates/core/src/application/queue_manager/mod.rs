// Queue Manager - declares queues and supervises their producer/consumer pools

pub mod constants;
mod consumer;
mod panic_guard;
mod producer;
mod registry;
mod shutdown;
mod stats;

use constants::*;
pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use registry::QueueInfo;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use stats::{QueueStats, QueueStatsSnapshot};

use crate::domain::{QueueDescriptor, QueueName};
use crate::error::{AppError, Result};
use crate::port::{Broker, MessageHandler};
use consumer::ConsumerUnit;
use producer::ProducerUnit;
use registry::{QueueEntry, QueueRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Owns every declared queue, its inbound buffer and its unit pools.
///
/// Declaration is a single check-and-insert under `declare_lock`; the
/// publish path only reads the registry and never waits on a declaration.
pub struct QueueManager {
    broker: Arc<dyn Broker>,
    buffer_capacity: usize,
    registry: QueueRegistry,
    declare_lock: Mutex<()>,
    closed: AtomicBool,
}

impl QueueManager {
    /// Create a manager with the default inbound buffer capacity (100)
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self::with_buffer_capacity(broker, DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a manager whose queues get `capacity`-slot buffers (min 1)
    pub fn with_buffer_capacity(broker: Arc<dyn Broker>, capacity: usize) -> Self {
        Self {
            broker,
            buffer_capacity: capacity.max(1),
            registry: QueueRegistry::default(),
            declare_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Declare `name` with the broker and launch its pools.
    ///
    /// Idempotent: a queue that is already defined is left untouched and
    /// `handler` is dropped. Broker errors during declaration are returned
    /// and nothing is recorded. A producer whose channel cannot be opened is
    /// skipped.
    pub async fn define_queue(
        &self,
        name: &str,
        producer_count: usize,
        consumer_count: usize,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<()> {
        let name = QueueName::new(name)?;
        let _guard = self.declare_lock.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::InvalidState(
                "queue manager is shut down".to_string(),
            ));
        }
        if self.registry.contains(name.as_str()) {
            debug!(queue = %name, "Queue is already defined");
            return Ok(());
        }

        let channel = self.broker.open_channel().await?;
        let declared = channel.declare_queue(name.as_str()).await;
        if let Err(e) = channel.close().await {
            debug!(queue = %name, error = %e, "Declaration channel close failed");
        }
        declared?;

        info!(
            queue = %name,
            producers = producer_count,
            consumers = consumer_count,
            capacity = self.buffer_capacity,
            "Queue declared"
        );

        let (buffer, inbound) = mpsc::channel(self.buffer_capacity);
        let inbound = Arc::new(Mutex::new(inbound));
        let (stop, token) = shutdown_channel();
        let stats = Arc::new(QueueStats::default());

        let mut producers = Vec::with_capacity(producer_count);
        for index in 0..producer_count {
            let channel = match self.broker.open_channel().await {
                Ok(channel) => channel,
                Err(e) => {
                    error!(queue = %name, unit = index, error = %e, "Failed to create channel for producer");
                    continue;
                }
            };
            let unit = ProducerUnit::new(
                name.clone(),
                index,
                channel,
                Arc::clone(&inbound),
                Arc::clone(&stats),
            );
            producers.push(tokio::spawn(unit.run(token.clone())));
        }

        let consumers = (0..consumer_count)
            .map(|index| {
                let unit = ConsumerUnit::new(
                    name.clone(),
                    index,
                    Arc::clone(&self.broker),
                    Arc::clone(&handler),
                    Arc::clone(&stats),
                );
                tokio::spawn(unit.run(token.clone()))
            })
            .collect();

        self.registry.insert(QueueEntry {
            descriptor: QueueDescriptor::declared(name),
            buffer,
            inbound,
            capacity: self.buffer_capacity,
            producers,
            consumers,
            stop,
            stats,
        });

        Ok(())
    }

    /// Enqueue `payload` for publishing on `name`.
    ///
    /// Waits while the buffer is full; wrap in a timeout for bounded waits.
    /// Success means the payload is buffered, not that the broker has it.
    pub async fn send_message(&self, name: &str, payload: impl Into<String>) -> Result<()> {
        let (buffer, stats) = self
            .registry
            .sender_for(name)
            .ok_or_else(|| AppError::QueueNotDefined(name.to_string()))?;

        buffer
            .send(payload.into())
            .await
            .map_err(|_| {
                if self.closed.load(Ordering::SeqCst) {
                    AppError::InvalidState(format!("queue {} is shutting down", name))
                } else {
                    AppError::Internal(format!("buffer for queue {} has no receiver", name))
                }
            })?;
        stats.record_enqueued();
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn queue_info(&self, name: &str) -> Option<QueueInfo> {
        self.registry.info(name)
    }

    /// Every declared queue, ordered by name
    pub fn queues(&self) -> Vec<QueueInfo> {
        self.registry.infos()
    }

    /// Tear down all pools, then close the broker connection.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_with_grace(SHUTDOWN_GRACE_PERIOD).await
    }

    /// Buffers are closed first so producers publish what is already
    /// buffered; consumers are then signalled to stop. Units still running
    /// after `grace` are aborted.
    pub async fn shutdown_with_grace(&self, grace: Duration) -> Result<()> {
        let _guard = self.declare_lock.lock().await;
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let entries = self.registry.drain();
        info!(queues = entries.len(), "Shutting down queue pools");

        let mut producers = Vec::new();
        let mut consumers = Vec::new();
        let mut stops = Vec::new();
        let mut inbounds = Vec::new();
        for entry in entries {
            drop(entry.buffer);
            inbounds.push(entry.inbound);
            producers.extend(entry.producers);
            consumers.extend(entry.consumers);
            stops.push(entry.stop);
        }

        join_units("producer", producers, grace).await;
        // Anything still buffered had no producer left to publish it
        drop(inbounds);
        for stop in &stops {
            stop.shutdown();
        }
        join_units("consumer", consumers, grace).await;

        self.broker.close().await?;
        info!("Queue manager shut down");
        Ok(())
    }
}

async fn join_units(kind: &str, handles: Vec<JoinHandle<()>>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    for mut handle in handles {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(kind, error = %e, "Unit task ended abnormally"),
            Err(_) => {
                warn!(kind, "Unit did not stop within grace period, aborting");
                handle.abort();
            }
        }
    }
}
