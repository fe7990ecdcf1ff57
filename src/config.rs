use std::{fmt, time::Duration};

use crate::{gateway::QueryType, walker::nul_label_sentinel};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Transport retries for NS and address lookups.
pub const DEFAULT_DISCOVERY_RETRIES: usize = 3;
/// Transport retries for a single NSEC lookup.
pub const DEFAULT_NSEC_RETRIES: usize = 5;
/// Consecutive failed NSEC lookups before an endpoint leaves the pool.
pub const DEFAULT_MAX_FAILURES: u32 = 3;
pub const DEFAULT_PORT: u16 = 53;
pub const DEFAULT_OUTPUT_DIR: &str = "nwalk_out";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub timeout: Duration,
    pub discovery_retries: usize,
    pub nsec_retries: usize,
    pub port: u16,
}

impl GatewayConfig {
    pub fn retries_for(&self, qtype: QueryType) -> usize {
        match qtype {
            QueryType::Nsec => self.nsec_retries,
            QueryType::Ns | QueryType::A | QueryType::Aaaa => self.discovery_retries,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            discovery_retries: DEFAULT_DISCOVERY_RETRIES,
            nsec_retries: DEFAULT_NSEC_RETRIES,
            port: DEFAULT_PORT,
        }
    }
}

/// Policy for a single zone walk.
#[derive(Clone)]
pub struct WalkConfig {
    pub max_failures: u32,
    /// Extra chain-end test applied to every next name. `None` disables it.
    pub sentinel: Option<fn(&str) -> bool>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            sentinel: Some(nul_label_sentinel),
        }
    }
}

impl fmt::Debug for WalkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkConfig")
            .field("max_failures", &self.max_failures)
            .field("sentinel", &self.sentinel.is_some())
            .finish()
    }
}
