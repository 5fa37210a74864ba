// Queue Domain Model

use super::error::{DomainError, Result};
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// AMQP short strings cap queue names at 255 bytes
pub const MAX_QUEUE_NAME_LEN: usize = 255;

/// Validated broker queue name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QueueName(String);

impl QueueName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidQueueName(
                "queue name cannot be empty".to_string(),
            ));
        }
        if name.len() > MAX_QUEUE_NAME_LEN {
            return Err(DomainError::InvalidQueueName(format!(
                "queue name too long ({} bytes, max {})",
                name.len(),
                MAX_QUEUE_NAME_LEN
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Lets the registry look names up by &str (String and str hash alike)
impl Borrow<str> for QueueName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for QueueName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Registry record of a queue declared with the broker.
///
/// Created on the first successful declaration and never removed while the
/// process runs; the broker side is auto-delete once unused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueDescriptor {
    pub name: QueueName,
    pub declared: bool,
}

impl QueueDescriptor {
    pub fn declared(name: QueueName) -> Self {
        Self {
            name,
            declared: true,
        }
    }
}
