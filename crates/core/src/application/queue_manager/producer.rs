// Producer Unit - drains the inbound buffer into the broker

use super::shutdown::ShutdownToken;
use super::stats::QueueStats;
use crate::domain::QueueName;
use crate::port::BrokerChannel;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

/// Receiving end of a queue's inbound buffer, shared by all its producers
pub(crate) type SharedInbound = Arc<Mutex<mpsc::Receiver<String>>>;

/// One publishing task bound to its own broker channel
pub(crate) struct ProducerUnit {
    queue: QueueName,
    index: usize,
    channel: Box<dyn BrokerChannel>,
    inbound: SharedInbound,
    stats: Arc<QueueStats>,
}

impl ProducerUnit {
    pub(crate) fn new(
        queue: QueueName,
        index: usize,
        channel: Box<dyn BrokerChannel>,
        inbound: SharedInbound,
        stats: Arc<QueueStats>,
    ) -> Self {
        Self {
            queue,
            index,
            channel,
            inbound,
            stats,
        }
    }

    /// Publish buffered payloads until the buffer is closed or stop is signalled
    pub(crate) async fn run(self, mut shutdown: ShutdownToken) {
        info!(queue = %self.queue, unit = self.index, "Producer unit started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!(queue = %self.queue, unit = self.index, "Producer unit cancelled");
                    break;
                }
                next = recv_next(&self.inbound) => next,
            };

            match next {
                Some(payload) => self.publish(&payload).await,
                None => {
                    debug!(queue = %self.queue, unit = self.index, "Inbound buffer closed");
                    break;
                }
            }
        }

        if let Err(e) = self.channel.close().await {
            debug!(queue = %self.queue, unit = self.index, error = %e, "Producer channel close failed");
        }
        info!(queue = %self.queue, unit = self.index, "Producer unit stopped");
    }

    // At-most-once: a refused payload is logged, counted and dropped
    async fn publish(&self, payload: &str) {
        match self
            .channel
            .publish(self.queue.as_str(), payload.as_bytes())
            .await
        {
            Ok(()) => self.stats.record_published(),
            Err(e) => {
                self.stats.record_publish_failure();
                error!(
                    queue = %self.queue,
                    unit = self.index,
                    error = %e,
                    payload_len = payload.len(),
                    "Failed to publish message, dropping it"
                );
            }
        }
    }
}

async fn recv_next(inbound: &SharedInbound) -> Option<String> {
    inbound.lock().await.recv().await
}
