//! Enumerate DNS zones by walking their NSEC chain.
//!
//! Every NSEC record names the next owner in the zone's canonical order, so
//! asking an authoritative server for the NSEC record of each name in turn
//! lists the whole zone. See [`walk_zone`] for a complete walk and
//! [`NsecWalker`] for the underlying state machine.

pub mod config;
pub mod discovery;
pub mod error;
pub mod gateway;
pub mod name;
pub mod recorder;
pub mod report;
pub mod session;
pub mod walker;
pub mod zone;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{GatewayConfig, WalkConfig};
pub use discovery::{discover_endpoints, discover_nameservers, Endpoint, NameserverAddresses};
pub use error::{DomainError, QueryError, RecordError};
pub use gateway::{DnsGateway, QueryType, TrustDnsGateway};
pub use name::Domain;
pub use recorder::{ChainRecorder, DiscardRecorder, FileRecorder};
pub use session::{Session, SessionStats};
pub use walker::{EndpointPool, NsecWalker, Termination, WalkEvent, WalkState};
pub use zone::{walk_zone, WalkObserver, WalkReport};
