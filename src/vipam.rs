use std::{io::Write, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use common::{
    ledger::ServiceLedger,
    logging::enable_logger,
    reconcile::{reconcile, ReconcileOptions},
};
use vip_ipam::{AddressAllocator, PoolSpec};

mod common;

#[derive(Parser)]
#[clap(author, version, about = "Virtual IP address management for load-balanced services", long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print every address a pool specification expands to
    Expand {
        /// A CIDR block (192.168.1.0/24) or a comma-separated list of ranges
        /// (192.168.1.10-192.168.1.20,192.168.2.5-192.168.2.9)
        spec: String,
    },
    /// Assign VIPs to the services in a ledger file
    Reconcile(ReconcileArgs),
}

#[derive(clap::Args)]
struct ReconcileArgs {
    /// Path to the JSON service ledger
    #[clap(short, long)]
    ledger: PathBuf,

    /// Treat a missing ledger file as an empty ledger
    #[clap(long)]
    create: bool,

    /// Namespace the address pool belongs to
    #[clap(short, long, env = "VIPAM_NAMESPACE", default_value = "default")]
    namespace: String,

    /// CIDR block or range list to allocate VIPs from
    #[clap(short, long, env = "VIPAM_POOL")]
    pool: String,

    /// UID of a deleted service whose VIP should be released (may be repeated)
    #[clap(short, long = "delete")]
    deletions: Vec<String>,

    /// Write the updated ledger here instead of STDOUT
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Dump metrics in the Prometheus text format to STDERR when done
    #[clap(long)]
    metrics: bool,
}

#[tokio::main]
pub async fn main() {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    enable_logger(args.verbose);

    let exit_code = match args.command {
        Command::Expand { spec } => expand(&spec),
        Command::Reconcile(args) => run_reconcile(args).await,
    };
    std::process::exit(exit_code);
}

/// Handle the `expand` subcommand
fn expand(spec: &str) -> i32 {
    let addrs = match spec.parse::<PoolSpec>().and_then(|spec| spec.expand()) {
        Ok(addrs) => addrs,
        Err(err) => {
            log::error!("{}", err);
            return 1;
        }
    };
    log::debug!("{} expands to {} addresses", spec, addrs.len());

    let mut stdout = std::io::stdout().lock();
    for addr in addrs {
        if let Err(err) = writeln!(stdout, "{addr}") {
            log::error!("Failed to write output: {}", err);
            return 1;
        }
    }
    0
}

/// Handle the `reconcile` subcommand
async fn run_reconcile(args: ReconcileArgs) -> i32 {
    // Load the ledger
    let ledger = if args.create {
        ServiceLedger::load_or_default(&args.ledger)
    } else {
        ServiceLedger::load(&args.ledger)
    };
    let mut ledger = match ledger {
        Ok(ledger) => ledger,
        Err(err) => {
            log::error!("{}: {}", args.ledger.display(), err);
            return 1;
        }
    };
    log::debug!(
        "Loaded {} service(s) from {}",
        ledger.services.len(),
        args.ledger.display()
    );

    let allocator = Arc::new(AddressAllocator::new());
    let options = ReconcileOptions {
        namespace: args.namespace,
        pool: args.pool,
        deletions: args.deletions,
    };
    let report = match reconcile(Arc::clone(&allocator), &mut ledger, &options).await {
        Ok(report) => report,
        Err(err) => {
            log::error!("{}", err);
            return 1;
        }
    };

    if let Ok(stats) = allocator.pool_stats(&options.namespace) {
        log::info!(
            "Pool {} in namespace {:?}: {} of {} addresses leased",
            stats.spec,
            options.namespace,
            stats.leased,
            stats.size
        );
    }
    log::info!(
        "Restored {}, released {}, allocated {}, failed {}",
        report.restored,
        report.released,
        report.allocated,
        report.failed
    );

    // Write out the updated ledger
    let written = match &args.output {
        Some(path) => ledger.save(path),
        None => ledger.to_json().map(|json| println!("{json}")),
    };
    if let Err(err) = written {
        log::error!("{}", err);
        return 1;
    }

    if args.metrics {
        match vipam_metrics::render() {
            Ok(text) => eprint!("{text}"),
            Err(err) => log::error!("Failed to render metrics: {}", err),
        }
    }

    i32::from(report.failed > 0)
}
