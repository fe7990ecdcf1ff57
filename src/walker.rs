//! The NSEC chain walk for a single zone.
//!
//! [`NsecWalker`] asks the zone's authoritative servers for the NSEC record
//! of the current owner name and moves on to the record's next domain name
//! until the chain leads back to where it started. Each call to
//! [`Iterator::next`] performs exactly one NSEC query.

use std::fmt;

use rand::Rng;
use tracing::{debug, info};

use crate::{
    config::WalkConfig,
    discovery::Endpoint,
    gateway::{DnsGateway, QueryType},
    name::{normalize_name, Domain},
};

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The chain pointed back at the zone apex.
    Wrapped,
    /// The chain pointed at the name just queried.
    Stalled,
    /// The next name matched the configured sentinel.
    Sentinel,
    NoNameservers,
    NoAddresses,
    /// Every endpoint was dropped after repeated failures.
    EndpointsExhausted,
}

impl Termination {
    /// Whether the chain was followed to its end.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Wrapped | Self::Stalled | Self::Sentinel)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wrapped => "chain wrapped to the apex",
            Self::Stalled => "chain made no progress",
            Self::Sentinel => "chain reached the sentinel name",
            Self::NoNameservers => "no nameservers",
            Self::NoAddresses => "no nameserver addresses",
            Self::EndpointsExhausted => "no endpoints left",
        })
    }
}

/// What a single step of the walk observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    Discovered { name: String, endpoint: Endpoint },
    QueryFailed { endpoint: Endpoint, failures: u32 },
    EndpointRemoved { endpoint: Endpoint, remaining: usize },
}

impl WalkEvent {
    /// The endpoint the step's query went to.
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Self::Discovered { endpoint, .. }
            | Self::QueryFailed { endpoint, .. }
            | Self::EndpointRemoved { endpoint, .. } => endpoint,
        }
    }
}

/// Matches next names starting with a NUL label.
///
/// Some servers answer the last owner of a zone with `\000.<apex>` rather than
/// the apex itself.
pub fn nul_label_sentinel(name: &str) -> bool {
    name.starts_with("\\000.") || name.starts_with("\0.")
}

/// Endpoints still eligible for queries.
#[derive(Debug, Clone, Default)]
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Endpoint> {
        self.endpoints.get(idx)
    }

    /// Uniformly random index, `None` when the pool is empty.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.endpoints.is_empty() {
            None
        } else {
            Some(rng.gen_range(0..self.endpoints.len()))
        }
    }

    /// Removes exactly the endpoint at `idx`; other endpoints sharing its
    /// address stay.
    pub fn remove(&mut self, idx: usize) -> Endpoint {
        self.endpoints.remove(idx)
    }
}

#[derive(Debug, Clone)]
pub struct WalkState {
    pub start: Domain,
    pub current: String,
    /// Index into the pool of the endpoint being queried.
    pub active: Option<usize>,
    pub failures: u32,
    pub discovered: usize,
}

pub struct NsecWalker<'g, G: ?Sized, R> {
    gateway: &'g G,
    rng: R,
    pool: EndpointPool,
    state: WalkState,
    max_failures: u32,
    sentinel: Option<fn(&str) -> bool>,
    termination: Option<Termination>,
}

impl<'g, G, R> NsecWalker<'g, G, R>
where
    G: DnsGateway + ?Sized,
    R: Rng,
{
    pub fn new(
        gateway: &'g G,
        domain: Domain,
        endpoints: Vec<Endpoint>,
        mut rng: R,
        config: &WalkConfig,
    ) -> Self {
        let pool = EndpointPool::new(endpoints);
        let active = pool.pick(&mut rng);
        Self {
            gateway,
            rng,
            pool,
            state: WalkState {
                current: domain.as_str().to_owned(),
                start: domain,
                active,
                failures: 0,
                discovered: 0,
            },
            max_failures: config.max_failures.max(1),
            sentinel: config.sentinel,
            termination: None,
        }
    }

    pub fn state(&self) -> &WalkState {
        &self.state
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn active_endpoint(&self) -> Option<&Endpoint> {
        self.state.active.and_then(|idx| self.pool.get(idx))
    }

    /// `None` while the walk can still make progress.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    fn terminate(&mut self, termination: Termination) {
        info!(
            domain = %self.state.start,
            discovered = self.state.discovered,
            %termination,
            "walk finished"
        );
        self.termination = Some(termination);
    }

    fn failed(&mut self, idx: usize, endpoint: Endpoint) -> WalkEvent {
        self.state.failures += 1;
        if self.state.failures < self.max_failures {
            return WalkEvent::QueryFailed {
                endpoint,
                failures: self.state.failures,
            };
        }

        self.pool.remove(idx);
        self.state.failures = 0;
        self.state.active = self.pool.pick(&mut self.rng);
        info!(
            domain = %self.state.start,
            %endpoint,
            remaining = self.pool.len(),
            "dropping unresponsive endpoint"
        );
        if self.state.active.is_none() {
            self.terminate(Termination::EndpointsExhausted);
        }
        WalkEvent::EndpointRemoved {
            endpoint,
            remaining: self.pool.len(),
        }
    }

    /// Decides whether `next` ends the chain.
    fn chain_end(&self, next: &str) -> Option<Termination> {
        if self.state.start == *next {
            Some(Termination::Wrapped)
        } else if self.state.current == next {
            Some(Termination::Stalled)
        } else if self.sentinel.map_or(false, |is_sentinel| is_sentinel(next)) {
            Some(Termination::Sentinel)
        } else {
            None
        }
    }
}

impl<'g, G, R> Iterator for NsecWalker<'g, G, R>
where
    G: DnsGateway + ?Sized,
    R: Rng,
{
    type Item = WalkEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.termination.is_some() {
            return None;
        }
        let Some((idx, endpoint)) = self
            .state
            .active
            .and_then(|idx| self.pool.get(idx).map(|e| (idx, e.clone())))
        else {
            self.terminate(Termination::EndpointsExhausted);
            return None;
        };

        let answer = match self
            .gateway
            .query(Some(endpoint.address), &self.state.current, QueryType::Nsec)
        {
            Ok(answers) => answers.into_iter().next(),
            Err(err) => {
                debug!(%endpoint, name = %self.state.current, %err, "NSEC query failed");
                None
            }
        };
        let Some(next) = answer else {
            return Some(self.failed(idx, endpoint));
        };

        self.state.failures = 0;
        let next = normalize_name(&next);
        if let Some(termination) = self.chain_end(&next) {
            self.terminate(termination);
            return None;
        }

        self.state.current = next.clone();
        self.state.discovered += 1;
        Some(WalkEvent::Discovered {
            name: next,
            endpoint,
        })
    }
}
