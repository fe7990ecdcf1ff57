use std::{io, path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{ArgAction, Parser};
use nwalk::{
    config::{
        DEFAULT_DISCOVERY_RETRIES, DEFAULT_MAX_FAILURES, DEFAULT_NSEC_RETRIES, DEFAULT_OUTPUT_DIR,
        DEFAULT_PORT, DEFAULT_TIMEOUT,
    },
    ChainRecorder, DiscardRecorder, FileRecorder, GatewayConfig, Session, TrustDnsGateway,
    WalkConfig,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Examples:
    Single:
        nwalk <domain>
    List:
        cat domains.txt | nwalk
    Fast list:
        parallel -a domains.txt -j 10 nwalk";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = USAGE)]
struct Args {
    /// Zone to walk. Without it, zones are read from stdin, one per line
    domain: Option<String>,

    /// Directory receiving one nsec-<domain>.txt file per zone
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Do not write discovered names to disk
    #[arg(long)]
    no_save: bool,

    /// Per-query timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Transport retries for each NSEC query
    #[arg(short, long, default_value_t = DEFAULT_NSEC_RETRIES)]
    retries: usize,

    /// Transport retries for NS and address lookups
    #[arg(long, default_value_t = DEFAULT_DISCOVERY_RETRIES)]
    discovery_retries: usize,

    /// Consecutive failed NSEC queries before a nameserver address is dropped
    #[arg(long, default_value_t = DEFAULT_MAX_FAILURES)]
    max_failures: u32,

    /// Port of the authoritative nameservers
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Keep walking when a next name starts with a NUL label
    #[arg(long)]
    no_sentinel: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Seed for nameserver selection, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// More log output on stderr (repeatable); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.no_color {
        colored::control::set_override(false);
    }

    let gateway = TrustDnsGateway::new(GatewayConfig {
        timeout: Duration::from_secs(args.timeout),
        discovery_retries: args.discovery_retries,
        nsec_retries: args.retries,
        port: args.port,
    });
    let walk = WalkConfig {
        max_failures: args.max_failures,
        sentinel: if args.no_sentinel { None } else { WalkConfig::default().sentinel },
    };
    let recorder: Box<dyn ChainRecorder> = if args.no_save {
        Box::new(DiscardRecorder)
    } else {
        Box::new(FileRecorder::new(&args.output_dir))
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    debug!(?walk, "starting");

    let mut session = Session::new(gateway, recorder, rng, walk, io::stdout().lock());
    match args.domain {
        Some(domain) => {
            session.walk(&domain);
        }
        None => {
            session
                .walk_lines(io::stdin().lock())
                .context("cannot read zones from stdin")?;
        }
    }

    let stats = session.stats();
    info!(
        zones = stats.zones,
        completed = stats.completed,
        skipped = stats.skipped,
        names = stats.names,
        "done"
    );
    Ok(())
}
