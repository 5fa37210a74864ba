// lapin::Error -> AppError

use courier_core::error::AppError;

/// Wrap a lapin error with the operation that failed
pub(crate) fn map_lapin_error(operation: &str, err: lapin::Error) -> AppError {
    match &err {
        lapin::Error::IOError(io) => {
            AppError::Broker(format!("{} failed (connection I/O): {}", operation, io))
        }
        lapin::Error::ProtocolError(amqp) => {
            AppError::Broker(format!("{} rejected by broker: {}", operation, amqp))
        }
        _ => AppError::Broker(format!("{} failed: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_io_error_mentions_operation() {
        let err = lapin::Error::IOError(Arc::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )));
        let mapped = map_lapin_error("connect", err);
        assert!(matches!(mapped, AppError::Broker(_)));
        let msg = mapped.to_string();
        assert!(msg.contains("connect"));
        assert!(msg.contains("refused"));
    }
}
