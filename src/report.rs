use std::{fmt, io::Write};

use colored::{ColoredString, Colorize};
use tracing::warn;

use crate::{
    discovery::NameserverAddresses,
    error::{DomainError, RecordError},
    name::Domain,
    walker::{Termination, WalkEvent},
    zone::{WalkObserver, WalkReport},
};

fn zone(domain: &Domain) -> ColoredString {
    domain.as_str().cyan().bold()
}

fn server(name: &str) -> ColoredString {
    name.purple()
}

/// Prints walk progress for people watching a terminal.
pub struct ConsoleReporter<W> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{args}") {
            warn!(%err, "cannot write progress");
        }
    }

    pub fn start(&mut self, domain: &Domain) {
        self.line(format_args!("{}{}", "Nameservers for ".bright_magenta().bold(), zone(domain)));
    }

    pub fn invalid(&mut self, input: &str, err: &DomainError) {
        self.line(format_args!(
            "{} {}: {}",
            "Skipping".red().bold(),
            input.trim().yellow(),
            err
        ));
    }

    /// One line describing how the walk of a zone ended.
    pub fn summary(&mut self, report: &WalkReport) {
        let domain = zone(&report.domain);
        match report.termination {
            Termination::NoNameservers => {
                self.line(format_args!("    {}{}", "None for ".bright_black().bold(), domain))
            }
            Termination::NoAddresses => {
                self.line(format_args!("    {}{}", "No IPs for ".bright_black().bold(), domain))
            }
            Termination::EndpointsExhausted => self.line(format_args!(
                "{}{}{}",
                "No nameservers left for ".bright_black().bold(),
                domain,
                found_suffix(report.discovered.len())
            )),
            Termination::Wrapped | Termination::Stalled | Termination::Sentinel
                if report.discovered.is_empty() =>
            {
                let from = report
                    .last_endpoint
                    .as_ref()
                    .map(|e| format!(" from {} ({})", server(&e.nameserver), e.address))
                    .unwrap_or_default();
                self.line(format_args!("{}{}{}", "No NSEC records for ".red().bold(), domain, from))
            }
            Termination::Wrapped | Termination::Stalled | Termination::Sentinel => {
                self.line(format_args!(
                    "{}{}",
                    format!("{} NSEC records for ", report.discovered.len()).green().bold(),
                    domain
                ))
            }
        }
    }
}

fn found_suffix(count: usize) -> String {
    if count == 0 {
        String::new()
    } else {
        format!(" after {count} NSEC records")
    }
}

impl<W: Write> WalkObserver for ConsoleReporter<W> {
    fn nameservers(&mut self, domain: &Domain, nameservers: &[NameserverAddresses]) {
        if nameservers.is_empty() {
            return;
        }
        self.line(format_args!(
            "    {}{}",
            format!("{} found for ", nameservers.len()).blue().bold(),
            zone(domain)
        ));

        let mut total = 0;
        for ns in nameservers {
            self.line(format_args!(
                "        {}{}",
                "IPs for ".bright_magenta().bold(),
                server(&ns.name)
            ));
            if ns.addresses.is_empty() {
                self.line(format_args!(
                    "            {}{}",
                    "None for ".bright_black().bold(),
                    server(&ns.name)
                ));
            } else {
                self.line(format_args!(
                    "            {}{}",
                    format!("{} IPs for ", ns.addresses.len()).blue().bold(),
                    server(&ns.name)
                ));
            }
            total += ns.addresses.len();
        }

        if total > 0 {
            self.line(format_args!(
                "    {}{}",
                format!("{total} IPs for ").blue().bold(),
                zone(domain)
            ));
        }
    }

    fn event(&mut self, domain: &Domain, event: &WalkEvent) {
        match event {
            WalkEvent::Discovered { name, endpoint } => self.line(format_args!(
                "        {}{}{}{} {}{}{}",
                "NSEC for ".green().bold(),
                zone(domain),
                " from ".green().bold(),
                server(&endpoint.nameserver),
                format!("({})", endpoint.address).bright_black().bold(),
                ": ".green().bold(),
                name.yellow().bold()
            )),
            WalkEvent::EndpointRemoved { endpoint, .. } => self.line(format_args!(
                "        {}{} {}{}{}",
                "Failed with ".red().bold(),
                server(&endpoint.nameserver),
                format!("({})", endpoint.address).bright_black().bold(),
                " for ".red().bold(),
                zone(domain)
            )),
            WalkEvent::QueryFailed { .. } => {}
        }
    }

    fn record_failed(&mut self, _domain: &Domain, err: &RecordError) {
        self.line(format_args!("        {} {}", "error:".red().bold(), err));
    }
}
