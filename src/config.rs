//! Runtime configuration.
//!
//! The VM connection parameters are operator configuration, read from the
//! environment with logged fallbacks. Retry count, timeout and delay shape
//! the transport only - exhausting them is what escalates to a consensus
//! failure, but none of the values themselves are consensus-relevant.

use std::env;
use std::time::Duration;

use log::warn;

const DEFAULT_VM_ADDRESS: &str = "tcp://127.0.0.1:50051";
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// Connection parameters for the external VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Transport address: `tcp://host:port` or `unix:///path/to.sock`.
    pub address: String,

    /// Attempts per call before escalating (at least 1).
    pub max_attempts: u32,

    /// Per-attempt I/O timeout.
    pub request_timeout: Duration,

    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_VM_ADDRESS.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl VmConfig {
    /// Read the configuration from the environment, falling back to
    /// defaults (with a logged warning) on missing or unparsable values.
    ///
    /// Variables: `DN_VM_ADDRESS`, `DN_VM_MAX_ATTEMPTS`, `DN_VM_TIMEOUT_MS`,
    /// `DN_VM_RETRY_DELAY_MS`.
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (injectable for tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let address = lookup("DN_VM_ADDRESS").unwrap_or(defaults.address);
        let max_attempts =
            parse_or("DN_VM_MAX_ATTEMPTS", &lookup, defaults.max_attempts).max(1);
        let timeout_ms = parse_or("DN_VM_TIMEOUT_MS", &lookup, DEFAULT_REQUEST_TIMEOUT_MS);
        let delay_ms = parse_or("DN_VM_RETRY_DELAY_MS", &lookup, DEFAULT_RETRY_DELAY_MS);

        Self {
            address,
            max_attempts,
            request_timeout: Duration::from_millis(timeout_ms),
            retry_delay: Duration::from_millis(delay_ms),
        }
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> T {
    match lookup(name) {
        None => default,
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!("{raw:?} is not a valid value for {name}; using the default, {default}");
            default
        }),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = VmConfig::default();
        assert_eq!(cfg.address, "tcp://127.0.0.1:50051");
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.request_timeout, Duration::from_millis(2_000));
        assert_eq!(cfg.retry_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let cfg = VmConfig::from_lookup(|name| match name {
            "DN_VM_ADDRESS" => Some("unix:///tmp/dvm.sock".to_string()),
            "DN_VM_MAX_ATTEMPTS" => Some("3".to_string()),
            "DN_VM_TIMEOUT_MS" => Some("500".to_string()),
            "DN_VM_RETRY_DELAY_MS" => Some("50".to_string()),
            _ => None,
        });

        assert_eq!(cfg.address, "unix:///tmp/dvm.sock");
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.request_timeout, Duration::from_millis(500));
        assert_eq!(cfg.retry_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let cfg = VmConfig::from_lookup(|name| match name {
            "DN_VM_MAX_ATTEMPTS" => Some("lots".to_string()),
            "DN_VM_TIMEOUT_MS" => Some("-7".to_string()),
            _ => None,
        });

        assert_eq!(cfg.max_attempts, VmConfig::default().max_attempts);
        assert_eq!(cfg.request_timeout, VmConfig::default().request_timeout);
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let cfg = VmConfig::from_lookup(|name| match name {
            "DN_VM_MAX_ATTEMPTS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(cfg.max_attempts, 1);
    }
}
