use std::io::{self, BufRead, Write};

use rand::Rng;
use tracing::warn;

use crate::{
    config::WalkConfig,
    gateway::DnsGateway,
    name::Domain,
    recorder::ChainRecorder,
    report::ConsoleReporter,
    zone::{walk_zone, WalkReport},
};

/// Totals over every zone walked by a [`Session`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub zones: usize,
    pub completed: usize,
    pub skipped: usize,
    pub names: usize,
}

/// Walks zones one after another, each with its own endpoint pool and state.
pub struct Session<G, C, R, W> {
    gateway: G,
    recorder: C,
    rng: R,
    config: WalkConfig,
    reporter: ConsoleReporter<W>,
    stats: SessionStats,
}

impl<G, C, R, W> Session<G, C, R, W>
where
    G: DnsGateway,
    C: ChainRecorder,
    R: Rng,
    W: Write,
{
    pub fn new(gateway: G, recorder: C, rng: R, config: WalkConfig, out: W) -> Self {
        Self {
            gateway,
            recorder,
            rng,
            config,
            reporter: ConsoleReporter::new(out),
            stats: SessionStats::default(),
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn into_output(self) -> W {
        self.reporter.into_inner()
    }

    /// Walks the zone named by `input`. Input that is not a usable domain
    /// name is reported and skipped.
    pub fn walk(&mut self, input: &str) -> Option<WalkReport> {
        let domain = match Domain::parse(input) {
            Ok(domain) => domain,
            Err(err) => {
                warn!(input, %err, "skipping invalid domain");
                self.reporter.invalid(input, &err);
                self.stats.skipped += 1;
                return None;
            }
        };

        self.reporter.start(&domain);
        let report = walk_zone(
            &domain,
            &self.gateway,
            &mut self.recorder,
            &mut self.rng,
            &self.config,
            &mut self.reporter,
        );
        self.reporter.summary(&report);

        self.stats.zones += 1;
        self.stats.names += report.discovered.len();
        if report.termination.is_success() {
            self.stats.completed += 1;
        }
        Some(report)
    }

    /// Walks one zone per non-blank line of `input`, in order.
    pub fn walk_lines<B: BufRead>(&mut self, input: B) -> io::Result<SessionStats> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            self.walk(&line);
        }
        Ok(self.stats)
    }
}
