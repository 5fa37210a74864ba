// Courier Infrastructure - AMQP Adapter
// Implements: Broker, BrokerChannel, Acknowledger (lapin / RabbitMQ)

mod channel;
mod connection;
mod error;

pub use channel::AmqpChannel;
pub use connection::AmqpBroker;

// Note: lapin::Error conversion is handled by map_lapin_error
// due to Rust's orphan rules (cannot implement From<lapin::Error> for AppError here)
