// Message Handler Port
// Per-message processing capability plugged into a queue's consumer pool

use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

/// Handler-level failures, kept apart from transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Processing failed: {0}")]
    Failed(String),
}

/// Processes one delivered payload.
///
/// Called once per delivery by whichever consumer unit received it; the
/// delivery is acknowledged after `handle` returns, whatever the outcome.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &str) -> Result<(), HandlerError>;
}

/// Adapter turning an async closure into a [`MessageHandler`]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap a closure `Fn(String) -> impl Future<Output = Result<(), HandlerError>>`
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, payload: &str) -> Result<(), HandlerError> {
        (self.f)(payload.to_string()).await
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Sleep, then succeed
        Delay(Duration),
    }

    /// Records every payload it receives (on entry, before acting)
    pub struct RecordingHandler {
        behavior: MockBehavior,
        received: Mutex<Vec<String>>,
        completed: Mutex<usize>,
    }

    impl RecordingHandler {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                received: Mutex::new(Vec::new()),
                completed: Mutex::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn new_delayed(delay: Duration) -> Self {
            Self::new(MockBehavior::Delay(delay))
        }

        pub fn received(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.received.lock().unwrap().len()
        }

        /// Calls that ran to completion (returned Ok or Err)
        pub fn completed_count(&self) -> usize {
            *self.completed.lock().unwrap()
        }

        /// Poll until `count` payloads were received or `timeout` elapses
        pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
            let deadline = tokio::time::Instant::now() + timeout;
            while tokio::time::Instant::now() < deadline {
                if self.call_count() >= count {
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            self.call_count() >= count
        }
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(&self, payload: &str) -> Result<(), HandlerError> {
            self.received.lock().unwrap().push(payload.to_string());

            let result = match &self.behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(HandlerError::Failed(msg.clone())),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Delay(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(())
                }
            };

            *self.completed.lock().unwrap() += 1;
            result
        }
    }
}
