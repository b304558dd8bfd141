//! Relay configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Control message a consumer sends to register itself
pub const DEFAULT_CONTROL_MESSAGE: &str = "consumer";

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listen address (default: 0.0.0.0:3000)
    pub bind_addr: String,

    /// Text message that marks its sender as the consumer
    pub control_message: String,

    /// Upper bound of the pending message buffer, unbounded when None.
    /// The oldest message is evicted when full.
    pub max_pending: Option<usize>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            control_message: DEFAULT_CONTROL_MESSAGE.to_string(),
            max_pending: None,
        }
    }
}

impl RelayConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bind_addr` is not a socket address
    /// - `control_message` is empty or could be mistaken for a trace event
    /// - `max_pending` is zero
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.control_message.is_empty() {
            return Err(Error::InvalidConfig(
                "control_message must not be empty".to_string(),
            ));
        }

        // Trace events are JSON objects
        if self.control_message.trim_start().starts_with('{') {
            return Err(Error::InvalidConfig(format!(
                "control_message must not look like a JSON object: {}",
                self.control_message
            )));
        }

        if self.max_pending == Some(0) {
            return Err(Error::InvalidConfig(
                "max_pending must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            Error::InvalidConfig(format!("Invalid bind_addr {}: {}", self.bind_addr, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control_message, "consumer");
        assert_eq!(config.max_pending, None);
    }

    #[test]
    fn test_rejects_json_like_control_message() {
        let config = RelayConfig {
            control_message: r#"{"method":"consumer"}"#.to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_address_and_zero_bound() {
        let config = RelayConfig {
            bind_addr: "localhost".to_string(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_config_error());

        let config = RelayConfig {
            max_pending: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
