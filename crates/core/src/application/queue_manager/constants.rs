// Queue manager constants (No magic values)
use std::time::Duration;

/// Inbound buffer capacity per queue when none is configured
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// How long teardown waits for each pool to wind down before aborting it
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Content type stamped on every published message
pub const MESSAGE_CONTENT_TYPE: &str = "text/plain";
