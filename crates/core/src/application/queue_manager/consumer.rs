// Consumer Unit - pulls deliveries, runs the handler, acknowledges

use super::panic_guard::{execute_guarded, PanicGuardResult};
use super::shutdown::ShutdownToken;
use super::stats::QueueStats;
use crate::domain::QueueName;
use crate::port::{Broker, Delivery, MessageHandler};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One subscribing task with its own broker channel
pub(crate) struct ConsumerUnit {
    queue: QueueName,
    index: usize,
    broker: Arc<dyn Broker>,
    handler: Arc<dyn MessageHandler>,
    stats: Arc<QueueStats>,
}

impl ConsumerUnit {
    pub(crate) fn new(
        queue: QueueName,
        index: usize,
        broker: Arc<dyn Broker>,
        handler: Arc<dyn MessageHandler>,
        stats: Arc<QueueStats>,
    ) -> Self {
        Self {
            queue,
            index,
            broker,
            handler,
            stats,
        }
    }

    /// Consume until the subscription ends or stop is signalled.
    ///
    /// Setup failures are logged and the unit exits without retrying; the
    /// pool simply runs one consumer short.
    pub(crate) async fn run(self, mut shutdown: ShutdownToken) {
        let channel = match self.broker.open_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                self.stats.record_consumer_setup_failure();
                error!(queue = %self.queue, unit = self.index, error = %e, "Failed to create channel for consumer");
                return;
            }
        };

        let mut deliveries = match channel.subscribe(self.queue.as_str()).await {
            Ok(deliveries) => deliveries,
            Err(e) => {
                self.stats.record_consumer_setup_failure();
                error!(queue = %self.queue, unit = self.index, error = %e, "Failed to start consuming");
                if let Err(e) = channel.close().await {
                    debug!(queue = %self.queue, unit = self.index, error = %e, "Consumer channel close failed");
                }
                return;
            }
        };

        info!(queue = %self.queue, unit = self.index, "Consumer unit started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!(queue = %self.queue, unit = self.index, "Consumer unit cancelled");
                    break;
                }
                next = deliveries.next() => next,
            };

            match next {
                Some(Ok(delivery)) => self.process(delivery).await,
                Some(Err(e)) => {
                    error!(queue = %self.queue, unit = self.index, error = %e, "Delivery stream failed");
                    break;
                }
                None => {
                    info!(queue = %self.queue, unit = self.index, "Delivery stream closed");
                    break;
                }
            }
        }

        drop(deliveries);
        if let Err(e) = channel.close().await {
            debug!(queue = %self.queue, unit = self.index, error = %e, "Consumer channel close failed");
        }
        info!(queue = %self.queue, unit = self.index, "Consumer unit stopped");
    }

    /// Run the handler to completion, then ack exactly this one delivery
    async fn process(&self, delivery: Delivery) {
        let payload = delivery.payload();

        match execute_guarded(self.handler.handle(&payload)).await {
            PanicGuardResult::Success(Ok(())) => self.stats.record_consumed(),
            PanicGuardResult::Success(Err(e)) => {
                self.stats.record_handler_failure();
                warn!(queue = %self.queue, unit = self.index, error = %e, "Message handler failed");
            }
            PanicGuardResult::Panicked(msg) => {
                self.stats.record_handler_failure();
                error!(queue = %self.queue, unit = self.index, panic_msg = %msg, "Message handler panicked");
            }
        }

        if let Err(e) = delivery.ack().await {
            error!(queue = %self.queue, unit = self.index, error = %e, "Failed to acknowledge message");
        }
    }
}
