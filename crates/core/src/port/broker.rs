// Broker Port
// Abstraction over an AMQP-style message broker (connection -> channels -> queues)

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// Stream of deliveries for one subscription; ends when the channel is closed
pub type DeliveryStream = BoxStream<'static, Result<Delivery>>;

/// Broker connection
///
/// Implementations:
/// - AmqpBroker (infra-amqp): RabbitMQ via lapin
/// - mocks::InMemoryBroker: in-process queues for tests
#[async_trait]
pub trait Broker: Send + Sync {
    /// Open a new channel on the shared connection
    async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>>;

    /// Close the connection (in-flight channel operations fail afterwards)
    async fn close(&self) -> Result<()>;
}

/// A single broker channel.
///
/// Queue declaration is durable, auto-delete, non-exclusive and waits for
/// the broker's reply. Publishing goes through the default exchange with the
/// queue name as routing key. Subscriptions use manual acknowledgement.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn declare_queue(&self, queue: &str) -> Result<()>;

    /// Publish a `text/plain` message (non-mandatory, non-immediate)
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    async fn subscribe(&self, queue: &str) -> Result<DeliveryStream>;

    async fn close(&self) -> Result<()>;
}

/// Acknowledges exactly one delivery (never `multiple`)
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self) -> Result<()>;
}

/// A message delivered by the broker, acknowledged by consuming it
pub struct Delivery {
    body: Vec<u8>,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, acker: Box<dyn Acknowledger>) -> Self {
        Self { body, acker }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text; invalid UTF-8 is replaced rather than rejected
    pub fn payload(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub async fn ack(self) -> Result<()> {
        self.acker.ack().await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("body_len", &self.body.len())
            .finish()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::{mpsc, Mutex as AsyncMutex};

    struct MemoryMessage {
        tag: u64,
        body: Vec<u8>,
    }

    struct MemoryQueue {
        tx: mpsc::UnboundedSender<MemoryMessage>,
        // Subscribers compete for the receiver, which load-balances deliveries
        rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<MemoryMessage>>>,
        declare_count: usize,
    }

    impl MemoryQueue {
        fn new() -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                tx,
                rx: Arc::new(AsyncMutex::new(rx)),
                declare_count: 0,
            }
        }
    }

    #[derive(Default)]
    struct BrokerState {
        queues: HashMap<String, MemoryQueue>,
        published: Vec<(String, Vec<u8>)>,
        acks: HashMap<u64, usize>,
        next_tag: u64,
    }

    impl BrokerState {
        fn deliver(&mut self, queue: &str, body: Vec<u8>) -> Result<u64> {
            self.next_tag += 1;
            let tag = self.next_tag;
            let q = self.queues.get(queue).ok_or_else(|| {
                AppError::Broker(format!("NOT_FOUND - no queue '{}'", queue))
            })?;
            q.tx
                .send(MemoryMessage { tag, body })
                .map_err(|_| AppError::Broker(format!("queue '{}' is gone", queue)))?;
            Ok(tag)
        }
    }

    #[derive(Default)]
    struct Faults {
        channel_open: AtomicBool,
        declare: AtomicBool,
        publish: AtomicBool,
        subscribe: AtomicBool,
    }

    #[derive(Default)]
    struct Shared {
        state: Mutex<BrokerState>,
        faults: Faults,
        channels_opened: AtomicUsize,
        channels_closed: AtomicUsize,
        // Remaining channel opens before refusing (None = unlimited)
        channel_budget: Mutex<Option<usize>>,
        closed: AtomicBool,
    }

    /// In-process broker with per-operation fault injection.
    ///
    /// Clones share the same state, so a test keeps one handle for
    /// inspection and hands another to the code under test.
    #[derive(Clone, Default)]
    pub struct InMemoryBroker {
        shared: Arc<Shared>,
    }

    impl InMemoryBroker {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_channel_open(&self, fail: bool) {
            self.shared.faults.channel_open.store(fail, Ordering::SeqCst);
        }

        /// Allow `n` more channel opens, then refuse every later one
        pub fn allow_channel_opens(&self, n: usize) {
            *self.shared.channel_budget.lock().unwrap() = Some(n);
        }

        pub fn fail_declare(&self, fail: bool) {
            self.shared.faults.declare.store(fail, Ordering::SeqCst);
        }

        pub fn fail_publish(&self, fail: bool) {
            self.shared.faults.publish.store(fail, Ordering::SeqCst);
        }

        pub fn fail_subscribe(&self, fail: bool) {
            self.shared.faults.subscribe.store(fail, Ordering::SeqCst);
        }

        /// How many times `queue` was declared with the broker
        pub fn declare_count(&self, queue: &str) -> usize {
            let state = self.shared.state.lock().unwrap();
            state.queues.get(queue).map_or(0, |q| q.declare_count)
        }

        /// Payloads published to `queue`, in broker arrival order
        pub fn published(&self, queue: &str) -> Vec<String> {
            let state = self.shared.state.lock().unwrap();
            state
                .published
                .iter()
                .filter(|(q, _)| q == queue)
                .map(|(_, body)| String::from_utf8_lossy(body).into_owned())
                .collect()
        }

        /// Put a message straight onto a declared queue, bypassing producers
        pub fn inject(&self, queue: &str, payload: &str) -> Result<u64> {
            let mut state = self.shared.state.lock().unwrap();
            state.deliver(queue, payload.as_bytes().to_vec())
        }

        pub fn ack_count(&self, tag: u64) -> usize {
            let state = self.shared.state.lock().unwrap();
            state.acks.get(&tag).copied().unwrap_or(0)
        }

        /// Total acknowledgements across all deliveries
        pub fn acks_total(&self) -> usize {
            let state = self.shared.state.lock().unwrap();
            state.acks.values().sum()
        }

        /// True when no delivery was acknowledged more than once
        pub fn no_double_acks(&self) -> bool {
            let state = self.shared.state.lock().unwrap();
            state.acks.values().all(|&n| n == 1)
        }

        pub fn open_channels(&self) -> usize {
            self.shared.channels_opened.load(Ordering::SeqCst)
                - self.shared.channels_closed.load(Ordering::SeqCst)
        }

        pub fn is_closed(&self) -> bool {
            self.shared.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Broker for InMemoryBroker {
        async fn open_channel(&self) -> Result<Box<dyn BrokerChannel>> {
            if self.is_closed() {
                return Err(AppError::Broker("connection closed".to_string()));
            }
            if self.shared.faults.channel_open.load(Ordering::SeqCst) {
                return Err(AppError::Broker("channel open refused".to_string()));
            }
            if let Some(left) = self.shared.channel_budget.lock().unwrap().as_mut() {
                if *left == 0 {
                    return Err(AppError::Broker("channel limit reached".to_string()));
                }
                *left -= 1;
            }
            self.shared.channels_opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(InMemoryChannel {
                shared: Arc::clone(&self.shared),
                closed: AtomicBool::new(false),
            }))
        }

        async fn close(&self) -> Result<()> {
            self.shared.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InMemoryChannel {
        shared: Arc<Shared>,
        closed: AtomicBool,
    }

    impl InMemoryChannel {
        fn ensure_usable(&self) -> Result<()> {
            if self.closed.load(Ordering::SeqCst) || self.shared.closed.load(Ordering::SeqCst) {
                return Err(AppError::Broker("channel closed".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BrokerChannel for InMemoryChannel {
        async fn declare_queue(&self, queue: &str) -> Result<()> {
            self.ensure_usable()?;
            if self.shared.faults.declare.load(Ordering::SeqCst) {
                return Err(AppError::Broker(format!(
                    "declare of '{}' refused",
                    queue
                )));
            }
            let mut state = self.shared.state.lock().unwrap();
            let q = state
                .queues
                .entry(queue.to_string())
                .or_insert_with(MemoryQueue::new);
            q.declare_count += 1;
            Ok(())
        }

        async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
            self.ensure_usable()?;
            if self.shared.faults.publish.load(Ordering::SeqCst) {
                return Err(AppError::Broker("publish refused".to_string()));
            }
            let mut state = self.shared.state.lock().unwrap();
            state.deliver(queue, payload.to_vec())?;
            state.published.push((queue.to_string(), payload.to_vec()));
            Ok(())
        }

        async fn subscribe(&self, queue: &str) -> Result<DeliveryStream> {
            self.ensure_usable()?;
            if self.shared.faults.subscribe.load(Ordering::SeqCst) {
                return Err(AppError::Broker("subscribe refused".to_string()));
            }
            let rx = {
                let state = self.shared.state.lock().unwrap();
                let q = state.queues.get(queue).ok_or_else(|| {
                    AppError::Broker(format!("NOT_FOUND - no queue '{}'", queue))
                })?;
                Arc::clone(&q.rx)
            };

            let shared = Arc::clone(&self.shared);
            let stream = futures::stream::unfold((rx, shared), |(rx, shared)| async move {
                let message = rx.lock().await.recv().await?;
                let acker = MemoryAcker {
                    tag: message.tag,
                    shared: Arc::clone(&shared),
                };
                let delivery = Delivery::new(message.body, Box::new(acker));
                Some((Ok(delivery), (rx, shared)))
            });
            Ok(stream.boxed())
        }

        async fn close(&self) -> Result<()> {
            if !self.closed.swap(true, Ordering::SeqCst) {
                self.shared.channels_closed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct MemoryAcker {
        tag: u64,
        shared: Arc<Shared>,
    }

    #[async_trait]
    impl Acknowledger for MemoryAcker {
        async fn ack(&self) -> Result<()> {
            let mut state = self.shared.state.lock().unwrap();
            *state.acks.entry(self.tag).or_insert(0) += 1;
            Ok(())
        }
    }
}
