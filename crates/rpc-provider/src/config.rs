//! Provider construction options (§4.3 "Construction").

use std::time::Duration;

use rpc_transport::OriginPolicy;

/// Default handle TTL: 10 minutes.
pub const DEFAULT_HANDLE_TTL: Duration = Duration::from_secs(10 * 60);
/// Default sweep interval: 60 seconds.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Default `targetOrigin` for outgoing broadcasts.
pub const DEFAULT_TARGET_ORIGIN: &str = "*";

/// Configuration accepted by [`crate::Provider::spawn`] (§4.3).
pub struct ProviderConfig {
    /// Channel name both peers were constructed with; messages for any
    /// other name are dropped (§4.3 "filter by channel name").
    pub name: String,
    /// How long a handle may sit idle before the sweeper reclaims it.
    /// Zero disables the sweeper entirely (§4.3 "Handle TTL sweeper").
    pub handle_ttl: Duration,
    /// How often the sweeper checks for idle handles. Zero disables the
    /// sweeper entirely.
    pub sweep_interval: Duration,
    /// Origin allow-list applied to every inbound message (§4.3 "Origin
    /// policy").
    pub allowed_origins: OriginPolicy,
    /// `targetOrigin` used for the initial `READY`/`INIT_ERROR` broadcast.
    /// Responses to a specific peer echo that peer's own origin instead.
    pub target_origin: String,
}

impl ProviderConfig {
    /// A config with every default but the channel `name` (§4.3: `handleTtlMs`
    /// defaults to 10 minutes, `sweepIntervalMs` to 60 seconds,
    /// `targetOrigin` to `"*"`, and no origin restriction).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle_ttl: DEFAULT_HANDLE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            allowed_origins: OriginPolicy::Any,
            target_origin: DEFAULT_TARGET_ORIGIN.to_string(),
        }
    }

    /// `true` if the handle sweeper should never run (§4.3 "Disabled when
    /// either configuration is zero").
    #[must_use]
    pub fn sweeper_disabled(&self) -> bool {
        self.handle_ttl.is_zero() || self.sweep_interval.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ProviderConfig::new("widget");
        assert_eq!(cfg.handle_ttl, Duration::from_secs(600));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(60));
        assert_eq!(cfg.target_origin, "*");
        assert!(!cfg.sweeper_disabled());
    }

    #[test]
    fn zero_ttl_disables_sweeper() {
        let mut cfg = ProviderConfig::new("widget");
        cfg.handle_ttl = Duration::ZERO;
        assert!(cfg.sweeper_disabled());
    }
}
