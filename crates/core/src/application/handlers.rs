// Built-in message handlers

use crate::port::{HandlerError, MessageHandler};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Logs each event, simulates `delay` of work, logs completion.
///
/// The delay is an async sleep inside the consumer unit, so it only holds
/// up the unit that received the message.
pub struct DelayedLogHandler {
    delay: Duration,
}

impl DelayedLogHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl MessageHandler for DelayedLogHandler {
    async fn handle(&self, payload: &str) -> Result<(), HandlerError> {
        info!(event = %payload, delay_ms = self.delay.as_millis() as u64, "Received message, starting work");
        tokio::time::sleep(self.delay).await;
        info!(event = %payload, "Processed message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_delayed_handler_waits_for_delay() {
        let handler = DelayedLogHandler::new(Duration::from_secs(10));
        let start = tokio::time::Instant::now();
        handler.handle("order-1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
