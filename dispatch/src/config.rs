//! Bridge configuration.

use extbridge_hostapi::BridgeLimits;

/// Default ceiling on a serialized reservation plan (64 KiB).
pub const DEFAULT_MAX_PLAN_BYTES: usize = 64 * 1024;

/// Configuration for a `Bridge`.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Input limits enforced before any capability is invoked.
    pub limits: BridgeLimits,

    /// Whether reservation sessions are supported.
    /// When false, `begin_reservations` reports `NotImplemented`.
    pub reservations_enabled: bool,

    /// Maximum serialized plan size accepted by `begin_reservations`.
    pub max_plan_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            limits: BridgeLimits::default(),
            reservations_enabled: true,
            max_plan_bytes: DEFAULT_MAX_PLAN_BYTES,
        }
    }
}
