// Domain Layer - Pure business logic and entities

pub mod error;
pub mod queue;
pub mod user;

// Re-exports
pub use error::DomainError;
pub use queue::{QueueDescriptor, QueueName};
pub use user::{User, UserId};
