//! Reconnection policy for the event channel
//!
//! Exponential backoff with optional jitter. `max_retries = None` keeps
//! retrying for as long as the channel is open.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnection policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectionPolicy {
    /// Whether to reconnect at all after the first disconnect (default: true)
    pub enabled: bool,
    /// Maximum consecutive failed attempts, unbounded when None (default: None)
    pub max_retries: Option<u32>,
    /// Initial backoff delay in milliseconds (default: 1000ms)
    pub backoff_initial_ms: u64,
    /// Maximum backoff delay in milliseconds (default: 30000ms)
    pub backoff_max_ms: u64,
    /// Backoff multiplier (default: 2.0)
    pub backoff_multiplier: f64,
    /// Whether to add jitter to backoff (default: true)
    pub jitter_enabled: bool,
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: None,
            backoff_initial_ms: 1000,
            backoff_max_ms: 30000,
            backoff_multiplier: 2.0,
            jitter_enabled: true,
        }
    }
}

impl ReconnectionPolicy {
    /// A policy that never reconnects
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Fast retries without jitter, for local collectors and tests
    pub fn aggressive() -> Self {
        Self {
            enabled: true,
            max_retries: None,
            backoff_initial_ms: 50,
            backoff_max_ms: 1000,
            backoff_multiplier: 1.5,
            jitter_enabled: false,
        }
    }

    /// Validate policy parameters
    pub fn validate(&self) -> crate::Result<()> {
        if self.backoff_multiplier < 1.0 {
            return Err(crate::Error::InvalidConfig(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.backoff_initial_ms > self.backoff_max_ms {
            return Err(crate::Error::InvalidConfig(format!(
                "backoff_initial_ms ({}) exceeds backoff_max_ms ({})",
                self.backoff_initial_ms, self.backoff_max_ms
            )));
        }
        Ok(())
    }

    /// Calculate backoff duration for a given attempt number (0-indexed)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms =
            (self.backoff_initial_ms as f64) * self.backoff_multiplier.powi(attempt as i32);

        let backoff_ms = backoff_ms.min(self.backoff_max_ms as f64);

        // Add jitter (0-25% of backoff)
        let final_ms = if self.jitter_enabled {
            backoff_ms + rand_jitter(backoff_ms * 0.25)
        } else {
            backoff_ms
        };

        Duration::from_millis(final_ms as u64)
    }

    /// Check if another attempt is allowed after `attempt` failures
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && self.max_retries.map_or(true, |max| attempt < max)
    }
}

/// Simple pseudo-random jitter using time-based seed
fn rand_jitter(max: f64) -> f64 {
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as f64;
    (seed % 1000.0) / 1000.0 * max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_clamps() {
        let policy = ReconnectionPolicy {
            jitter_enabled: false,
            ..Default::default()
        };
        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_backoff(10), Duration::from_millis(30000));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let policy = ReconnectionPolicy::default();
        let backoff = policy.calculate_backoff(0);
        assert!(backoff >= Duration::from_millis(1000));
        assert!(backoff <= Duration::from_millis(1250));
    }

    #[test]
    fn test_should_retry() {
        assert!(ReconnectionPolicy::default().should_retry(1_000));
        assert!(!ReconnectionPolicy::disabled().should_retry(0));

        let bounded = ReconnectionPolicy {
            max_retries: Some(2),
            ..Default::default()
        };
        assert!(bounded.should_retry(1));
        assert!(!bounded.should_retry(2));
    }

    #[test]
    fn test_validate_rejects_shrinking_multiplier() {
        let policy = ReconnectionPolicy {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
        assert!(ReconnectionPolicy::aggressive().validate().is_ok());
    }
}
