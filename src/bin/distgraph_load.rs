//! Load a binary graph across all ranks and optionally report how evenly the
//! edges ended up distributed.
//!
//! ```text
//! mpirun -n 16 distgraph-load -f graph.bin -b -s
//! ```
//!
//! Without the `mpi-support` feature the binary runs as a single rank.

use clap::Parser;
use distgraph::prelude::*;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Binary graph file (header, edge index, edge records).
    #[arg(short, long)]
    file: PathBuf,

    /// Rebalance vertex ranges by edge count before reading.
    #[arg(short, long)]
    balanced: bool,

    /// Ranks sharing one node.
    #[arg(short, long, default_value_t = 1)]
    ranks_per_node: usize,

    /// Report the per-rank edge distribution after loading.
    #[arg(short, long)]
    stats: bool,

    /// Print the distribution report as JSON on rank 0 (implies --stats).
    #[arg(long)]
    json: bool,
}

impl Args {
    fn loader_config(&self) -> LoaderConfig {
        let strategy = if self.balanced {
            PartitionStrategy::Balanced
        } else {
            PartitionStrategy::Naive
        };
        LoaderConfig::new(&self.file)
            .with_strategy(strategy)
            .with_ranks_per_node(self.ranks_per_node)
    }
}

fn run<C: Communicator>(comm: &C, args: &Args) -> Result<(), Box<dyn Error>> {
    let dg = load_dist_graph(comm, &args.loader_config())?;

    if args.stats || args.json {
        let stats = dg.report_distribution_stats(comm)?;
        if comm.rank() == 0 {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{stats}");
            }
        }
    }
    Ok(())
}

#[cfg(feature = "mpi-support")]
fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let comm = match MpiComm::new() {
        Ok(comm) => comm,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = run(&comm, &args) {
        log::error!("rank {}: {e}", comm.rank());
        comm.abort(1);
    }
    ExitCode::SUCCESS
}

#[cfg(not(feature = "mpi-support"))]
fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&NoComm, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
