// Application Layer - Use Cases and the queue pool manager

pub mod handlers;
pub mod queue_manager;
pub mod user_service;

// Re-exports
pub use handlers::DelayedLogHandler;
pub use queue_manager::{QueueInfo, QueueManager, QueueStatsSnapshot};
pub use user_service::{RegistrationService, UserService};
