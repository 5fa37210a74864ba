// Port Layer - Interfaces for external dependencies

pub mod broker;
pub mod id_provider; // For deterministic testing
pub mod message_handler;
pub mod time_provider;
pub mod user_repository;

// Re-exports
pub use broker::{Acknowledger, Broker, BrokerChannel, Delivery, DeliveryStream};
pub use id_provider::IdProvider;
pub use message_handler::{handler_fn, FnHandler, HandlerError, MessageHandler};
pub use time_provider::TimeProvider;
pub use user_repository::UserRepository;
