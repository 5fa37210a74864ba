//! HTTP API Layer
//!
//! Exposes queue publishing and user registration over JSON/HTTP.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{router, AppState, HttpServer, HttpServerConfig, QueueDefaults};
