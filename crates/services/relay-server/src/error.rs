//! Error types for the relay

/// Result type alias using the relay Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the relay
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// WebSocket handshake or transport error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocketError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("max_pending".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: max_pending");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_websocket_error_conversion() {
        let err = Error::from(tokio_tungstenite::tungstenite::Error::ConnectionClosed);
        assert!(matches!(err, Error::WebSocketError(_)));
    }
}
