use rand::Rng;
use tracing::warn;

use crate::{
    config::WalkConfig,
    discovery::{discover_nameservers, endpoints, Endpoint, NameserverAddresses},
    error::RecordError,
    gateway::DnsGateway,
    name::Domain,
    recorder::ChainRecorder,
    walker::{NsecWalker, Termination, WalkEvent},
};

/// Everything learned while walking one zone.
#[derive(Debug, Clone)]
pub struct WalkReport {
    pub domain: Domain,
    pub nameservers: Vec<NameserverAddresses>,
    pub termination: Termination,
    /// Next names in the order they were found.
    pub discovered: Vec<String>,
    /// Endpoint in use when the walk ended.
    pub last_endpoint: Option<Endpoint>,
    pub record_failures: usize,
}

impl WalkReport {
    pub fn endpoint_count(&self) -> usize {
        self.nameservers.iter().map(|ns| ns.addresses.len()).sum()
    }
}

/// Live progress of [`walk_zone`].
pub trait WalkObserver {
    fn nameservers(&mut self, _domain: &Domain, _nameservers: &[NameserverAddresses]) {}

    fn event(&mut self, _domain: &Domain, _event: &WalkEvent) {}

    fn record_failed(&mut self, _domain: &Domain, _err: &RecordError) {}
}

impl WalkObserver for () {}

/// Discovers the zone's nameservers, then walks its NSEC chain to the end,
/// handing every new name to `recorder`.
pub fn walk_zone<G, C, R, O>(
    domain: &Domain,
    gateway: &G,
    recorder: &mut C,
    rng: R,
    config: &WalkConfig,
    observer: &mut O,
) -> WalkReport
where
    G: DnsGateway + ?Sized,
    C: ChainRecorder + ?Sized,
    R: Rng,
    O: WalkObserver + ?Sized,
{
    let nameservers = discover_nameservers(gateway, domain);
    observer.nameservers(domain, &nameservers);

    let mut report = WalkReport {
        domain: domain.clone(),
        termination: Termination::NoNameservers,
        discovered: Vec::new(),
        last_endpoint: None,
        record_failures: 0,
        nameservers,
    };
    if report.nameservers.is_empty() {
        return report;
    }
    let endpoints = endpoints(&report.nameservers);
    if endpoints.is_empty() {
        report.termination = Termination::NoAddresses;
        return report;
    }

    let mut walker = NsecWalker::new(gateway, domain.clone(), endpoints, rng, config);
    for event in walker.by_ref() {
        if let WalkEvent::Discovered { name, .. } = &event {
            if let Err(err) = recorder.record(domain, name) {
                warn!(%domain, %err, "cannot record discovered name");
                report.record_failures += 1;
                observer.record_failed(domain, &err);
            }
            report.discovered.push(name.clone());
        }
        report.last_endpoint = Some(event.endpoint().clone());
        observer.event(domain, &event);
    }

    if let Some(active) = walker.active_endpoint() {
        report.last_endpoint = Some(active.clone());
    }
    report.termination = walker
        .termination()
        .unwrap_or(Termination::EndpointsExhausted);
    gateway.release_servers();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::QueryType,
        testing::{ip, ScriptedGateway},
    };
    use rand::rngs::mock::StepRng;

    #[derive(Default)]
    struct Collect(Vec<(String, String)>);

    impl ChainRecorder for Collect {
        fn record(&mut self, domain: &Domain, next: &str) -> Result<(), RecordError> {
            self.0.push((domain.to_string(), next.to_owned()));
            Ok(())
        }
    }

    struct Broken;

    impl ChainRecorder for Broken {
        fn record(&mut self, _domain: &Domain, _next: &str) -> Result<(), RecordError> {
            Err(RecordError {
                path: "nowhere".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    #[derive(Default)]
    struct Events(Vec<WalkEvent>, usize);

    impl WalkObserver for Events {
        fn event(&mut self, _domain: &Domain, event: &WalkEvent) {
            self.0.push(event.clone());
        }

        fn record_failed(&mut self, _domain: &Domain, _err: &RecordError) {
            self.1 += 1;
        }
    }

    fn domain() -> Domain {
        Domain::parse("example.test").unwrap()
    }

    fn zone() -> ScriptedGateway {
        ScriptedGateway::new()
            .answer(None, "example.test", QueryType::Ns, &["ns1.example.test"])
            .answer(None, "ns1.example.test", QueryType::A, &["10.0.0.1"])
            .nsec("10.0.0.1", "example.test", "b.example.test")
            .nsec("10.0.0.1", "b.example.test", "example.test")
    }

    #[test]
    fn records_every_discovered_name() {
        let gateway = zone();
        let mut recorder = Collect::default();
        let report = walk_zone(
            &domain(),
            &gateway,
            &mut recorder,
            StepRng::new(0, 0),
            &WalkConfig::default(),
            &mut (),
        );

        assert_eq!(report.termination, Termination::Wrapped);
        assert_eq!(report.discovered, vec!["b.example.test"]);
        assert_eq!(
            recorder.0,
            vec![("example.test".to_string(), "b.example.test".to_string())]
        );
        assert_eq!(report.endpoint_count(), 1);
        assert_eq!(
            report.last_endpoint.map(|e| e.address),
            Some(ip("10.0.0.1"))
        );
    }

    #[test]
    fn server_state_is_released_after_each_walk() {
        let gateway = zone();
        for _ in 0..3 {
            walk_zone(
                &domain(),
                &gateway,
                &mut Collect::default(),
                StepRng::new(0, 0),
                &WalkConfig::default(),
                &mut (),
            );
        }
        assert_eq!(gateway.releases(), 3);
    }

    #[test]
    fn no_nameservers_aborts_before_walking() {
        let gateway = ScriptedGateway::new();
        let report = walk_zone(
            &domain(),
            &gateway,
            &mut Collect::default(),
            StepRng::new(0, 0),
            &WalkConfig::default(),
            &mut (),
        );
        assert_eq!(report.termination, Termination::NoNameservers);
        assert!(report.discovered.is_empty());
        assert_eq!(gateway.log().len(), 1);
    }

    #[test]
    fn unresolvable_nameservers_abort_before_walking() {
        let gateway = ScriptedGateway::new().answer(
            None,
            "example.test",
            QueryType::Ns,
            &["ns1.example.test", "ns2.example.test"],
        );
        let report = walk_zone(
            &domain(),
            &gateway,
            &mut Collect::default(),
            StepRng::new(0, 0),
            &WalkConfig::default(),
            &mut (),
        );
        assert_eq!(report.termination, Termination::NoAddresses);
        assert_eq!(report.nameservers.len(), 2);
        assert!(gateway
            .log()
            .iter()
            .all(|(_, _, qtype)| *qtype != QueryType::Nsec));
    }

    #[test]
    fn write_failures_do_not_stop_the_walk() {
        let gateway = zone();
        let mut events = Events::default();
        let report = walk_zone(
            &domain(),
            &gateway,
            &mut Broken,
            StepRng::new(0, 0),
            &WalkConfig::default(),
            &mut events,
        );
        assert_eq!(report.termination, Termination::Wrapped);
        assert_eq!(report.discovered, vec!["b.example.test"]);
        assert_eq!(report.record_failures, 1);
        assert_eq!(events.1, 1);
        assert_eq!(events.0.len(), 1);
    }

    #[test]
    fn exhaustion_keeps_what_was_found() {
        let gateway = ScriptedGateway::new()
            .answer(None, "example.test", QueryType::Ns, &["ns1.example.test"])
            .answer(None, "ns1.example.test", QueryType::A, &["10.0.0.1"])
            .nsec("10.0.0.1", "example.test", "b.example.test");
        let report = walk_zone(
            &domain(),
            &gateway,
            &mut Collect::default(),
            StepRng::new(0, 0),
            &WalkConfig::default(),
            &mut (),
        );
        assert_eq!(report.termination, Termination::EndpointsExhausted);
        assert_eq!(report.discovered, vec!["b.example.test"]);
    }
}
