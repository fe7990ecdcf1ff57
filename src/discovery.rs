use std::{fmt, net::IpAddr};

use tracing::{debug, info};

use crate::{
    gateway::{DnsGateway, QueryType},
    name::Domain,
};

/// One queryable address of one nameserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub nameserver: String,
    pub address: IpAddr,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.nameserver, self.address)
    }
}

/// A nameserver of the zone and whatever addresses it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameserverAddresses {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

/// Looks up the zone's NS set and the addresses of every nameserver in it.
///
/// Nameservers keep the order the NS answer listed them in. A nameserver
/// whose addresses cannot be resolved is kept with an empty address list so
/// callers can report it; it contributes no endpoints.
pub fn discover_nameservers<G>(gateway: &G, domain: &Domain) -> Vec<NameserverAddresses>
where
    G: DnsGateway + ?Sized,
{
    let names = match gateway.query(None, domain.as_str(), QueryType::Ns) {
        Ok(names) => names,
        Err(err) => {
            debug!(%domain, %err, "NS lookup failed");
            Vec::new()
        }
    };

    names
        .into_iter()
        .map(|name| {
            let addresses = gateway.query_addresses(&name);
            if addresses.is_empty() {
                info!(%domain, nameserver = %name, "nameserver has no addresses");
            }
            NameserverAddresses { name, addresses }
        })
        .collect()
}

/// Flattens nameservers into `(nameserver, address)` endpoints without
/// deduplicating shared addresses.
pub fn endpoints(nameservers: &[NameserverAddresses]) -> Vec<Endpoint> {
    nameservers
        .iter()
        .flat_map(|ns| {
            ns.addresses.iter().map(move |&address| Endpoint {
                nameserver: ns.name.clone(),
                address,
            })
        })
        .collect()
}

pub fn discover_endpoints<G>(gateway: &G, domain: &Domain) -> Vec<Endpoint>
where
    G: DnsGateway + ?Sized,
{
    endpoints(&discover_nameservers(gateway, domain))
}
