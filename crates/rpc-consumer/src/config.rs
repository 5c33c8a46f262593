//! Consumer construction options (§4.4 "Construction").

use std::time::Duration;

use rpc_transport::OriginPolicy;

/// Default handshake timeout: 5 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default GC sweep interval: 60 seconds.
pub const DEFAULT_GC_SWEEP_INTERVAL: Duration = Duration::from_millis(60_000);

/// `releaseOnPageHide` policy (§4.4 "Page-lifecycle release").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseOnPageHide {
    /// Release only handles observed with a non-persisted page-hide
    /// transition. The spec's default.
    #[default]
    NonPersisted,
    /// Release every active handle on any page-hide event.
    All,
    /// Ignore page-hide entirely; only `shutdown()` releases handles.
    Off,
}

/// Configuration accepted by [`crate::create_consumer`] (§4.4).
pub struct ConsumerConfig {
    /// How long to wait for the first matching `READY`/`INIT_ERROR` before
    /// the init future rejects with a handshake timeout.
    pub timeout: Duration,
    /// How often the weak-reference sweeper checks for collected handle
    /// proxies (§4.4 "Auto-release").
    pub gc_sweep_interval: Duration,
    /// What `on_page_hide` does with outstanding handles.
    pub release_on_page_hide: ReleaseOnPageHide,
    /// `false` (default): build a materialised tree. `true`: build a lazy
    /// proxy that resolves children on access (§4.4 "hideStructure").
    pub hide_structure: bool,
    /// Origin allow-list applied to the handshake and every subsequent
    /// message.
    pub allowed_origins: OriginPolicy,
    /// `targetOrigin` used when sending `GET`/`CALL`/`RELEASE_HANDLE`.
    pub target_origin: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            gc_sweep_interval: DEFAULT_GC_SWEEP_INTERVAL,
            release_on_page_hide: ReleaseOnPageHide::NonPersisted,
            hide_structure: false,
            allowed_origins: OriginPolicy::Any,
            target_origin: "*".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ConsumerConfig::default();
        assert_eq!(cfg.timeout, Duration::from_millis(5000));
        assert_eq!(cfg.gc_sweep_interval, Duration::from_millis(60_000));
        assert_eq!(cfg.release_on_page_hide, ReleaseOnPageHide::NonPersisted);
        assert!(!cfg.hide_structure);
    }
}
