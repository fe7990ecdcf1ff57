use std::{cell::RefCell, collections::HashMap, fmt, net::IpAddr, rc::Rc};

use tracing::{debug, warn};
use trust_dns_proto::rr::RecordType;
use trust_dns_resolver::{
    config::{LookupIpStrategy, NameServerConfigGroup, ResolverConfig, ResolverOpts},
    Name, Resolver,
};

use crate::{config::GatewayConfig, error::QueryError, name::normalize_name};

/// Record types the walker ever asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Ns,
    A,
    Aaaa,
    Nsec,
}

impl From<QueryType> for RecordType {
    fn from(qtype: QueryType) -> Self {
        match qtype {
            QueryType::Ns => RecordType::NS,
            QueryType::A => RecordType::A,
            QueryType::Aaaa => RecordType::AAAA,
            QueryType::Nsec => RecordType::NSEC,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&RecordType::from(*self), f)
    }
}

/// Single DNS lookups, either through the system resolver or sent straight
/// to one server.
///
/// Answers come back as normalized strings: names without the trailing root
/// dot, addresses in their textual form. For NSEC lookups only the next
/// domain name of each record is returned.
pub trait DnsGateway {
    fn query(
        &self,
        server: Option<IpAddr>,
        name: &str,
        qtype: QueryType,
    ) -> Result<Vec<String>, QueryError>;

    /// A and AAAA addresses of `name` through the system resolver. Lookup
    /// failures read as "no addresses".
    fn query_addresses(&self, name: &str) -> Vec<IpAddr> {
        let mut addresses = Vec::new();
        for qtype in [QueryType::A, QueryType::Aaaa] {
            match self.query(None, name, qtype) {
                Ok(answers) => {
                    addresses.extend(answers.iter().filter_map(|a| a.parse::<IpAddr>().ok()))
                }
                Err(err) => debug!(%name, %qtype, %err, "address lookup failed"),
            }
        }
        addresses
    }

    /// Called once a zone walk is over. Per-server state kept for that walk
    /// may be dropped.
    fn release_servers(&self) {}
}

/// [`DnsGateway`] backed by the blocking trust-dns resolver.
pub struct TrustDnsGateway {
    config: GatewayConfig,
    resolvers: RefCell<HashMap<(Option<IpAddr>, usize), Rc<Resolver>>>,
}

impl TrustDnsGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            resolvers: RefCell::new(HashMap::new()),
        }
    }

    fn resolver(&self, server: Option<IpAddr>, retries: usize) -> Result<Rc<Resolver>, QueryError> {
        let key = (server, retries);
        if let Some(resolver) = self.resolvers.borrow().get(&key) {
            return Ok(Rc::clone(resolver));
        }

        let (config, opts) = self.resolver_config(server, retries);
        let resolver = Rc::new(Resolver::new(config, opts)?);
        self.resolvers.borrow_mut().insert(key, Rc::clone(&resolver));
        Ok(resolver)
    }

    fn resolver_config(
        &self,
        server: Option<IpAddr>,
        retries: usize,
    ) -> (ResolverConfig, ResolverOpts) {
        let (config, mut opts) = match server {
            Some(ip) => {
                let mut opts = ResolverOpts::default();
                // Every retry of a failed NSEC query has to reach the server.
                opts.cache_size = 0;
                (
                    ResolverConfig::from_parts(
                        None,
                        vec![],
                        NameServerConfigGroup::from_ips_clear(&[ip], self.config.port, true),
                    ),
                    opts,
                )
            }
            None => system_config(),
        };
        opts.timeout = self.config.timeout;
        opts.attempts = retries;
        opts.ndots = 0;
        opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        (config, opts)
    }

    #[cfg(test)]
    fn cached_resolvers(&self) -> usize {
        self.resolvers.borrow().len()
    }
}

fn system_config() -> (ResolverConfig, ResolverOpts) {
    match trust_dns_resolver::system_conf::read_system_conf() {
        Ok(conf) => conf,
        Err(err) => {
            warn!(%err, "cannot read system resolver configuration, using defaults");
            (ResolverConfig::default(), ResolverOpts::default())
        }
    }
}

/// Parses `name` as a fully qualified name so no search domains get appended.
fn absolute(name: &str) -> Result<Name, QueryError> {
    Name::from_ascii(format!("{}.", name.trim_end_matches('.'))).map_err(|source| {
        QueryError::InvalidName {
            name: name.to_owned(),
            source,
        }
    })
}

impl DnsGateway for TrustDnsGateway {
    fn query(
        &self,
        server: Option<IpAddr>,
        name: &str,
        qtype: QueryType,
    ) -> Result<Vec<String>, QueryError> {
        let fqdn = absolute(name)?;
        let resolver = self.resolver(server, self.config.retries_for(qtype))?;
        let lookup = resolver.lookup(fqdn, qtype.into())?;

        let answers: Vec<String> = lookup
            .iter()
            .filter_map(|rdata| match qtype {
                QueryType::Ns => rdata.as_ns().map(|ns| normalize_name(&ns.to_ascii())),
                QueryType::A => rdata.as_a().map(ToString::to_string),
                QueryType::Aaaa => rdata.as_aaaa().map(ToString::to_string),
                QueryType::Nsec => rdata
                    .as_dnssec()
                    .and_then(|dnssec| dnssec.as_nsec())
                    .map(|nsec| normalize_name(&nsec.next_domain_name().to_ascii())),
            })
            .collect();

        debug!(?server, %name, %qtype, answers = answers.len(), "query answered");
        Ok(answers)
    }

    fn query_addresses(&self, name: &str) -> Vec<IpAddr> {
        let lookup = absolute(name).and_then(|fqdn| {
            let resolver = self.resolver(None, self.config.discovery_retries)?;
            Ok(resolver.lookup_ip(fqdn)?)
        });
        match lookup {
            Ok(ips) => ips.iter().collect(),
            Err(err) => {
                debug!(%name, %err, "address lookup failed");
                Vec::new()
            }
        }
    }

    fn release_servers(&self) {
        self.resolvers
            .borrow_mut()
            .retain(|(server, _), _| server.is_none());
    }
}
