//! Stencil Chain CLI - Run chain solver simulations from JSON configuration.

use std::path::{Path, PathBuf};
use std::time::Instant;

use stencil_chain::{
    compute::{RankReport, World, rank_path, run_rank},
    schema::SolverConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <config.json> [steps] [--canvas <prefix>] [--mpi]",
            args[0]
        );
        eprintln!();
        eprintln!("Run a distributed 1D stencil simulation from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json        Path to solver configuration file");
        eprintln!("  steps              Number of operator applications (default: from config)");
        eprintln!("  --canvas <prefix>  Write each rank's colorized history to <prefix><rank>.json");
        eprintln!("  --mpi              One process per rank under mpirun (needs the `mpi` feature)");
        eprintln!();
        eprintln!("Example configuration is printed with --example.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let mut steps_arg = None;
    let mut canvas_prefix = None;
    let mut use_mpi = false;
    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        if arg == "--canvas" {
            canvas_prefix = rest.next().map(PathBuf::from);
        } else if arg == "--mpi" {
            use_mpi = true;
        } else {
            steps_arg = arg.parse::<u64>().ok();
        }
    }

    let config = SolverConfig::from_json_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });
    let steps = steps_arg.unwrap_or(config.steps);

    if use_mpi {
        run_mpi(&config, steps, canvas_prefix.as_deref());
        return;
    }

    println!("Stencil Chain Simulation");
    println!("========================");
    println!(
        "Ranks: {} x {} points ({} variables), dx = {}",
        config.ranks, config.num_grids, config.variables, config.dx
    );
    println!("Operator: {:?}", config.operator);
    println!("Edge ghosts: {:?}, schedule: {:?}", config.edge_ghost, config.schedule);
    println!("Steps: {}", steps);
    println!();

    let start = Instant::now();
    let results = World::run(config.ranks, |comm| run_rank(&comm, &config, steps));
    let elapsed = start.elapsed();

    let results = results.unwrap_or_else(|e| {
        eprintln!("Runtime failure: {}", e);
        std::process::exit(1);
    });

    let mut reports = Vec::with_capacity(results.len());
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("Rank {} failed: {}", rank, e);
                std::process::exit(1);
            }
        }
    }

    println!("Final state:");
    for report in &reports {
        print_report(report);
    }
    let total: f64 = reports.iter().map(|r| r.stats.sum.iter().sum::<f64>()).sum();
    println!("  total sum: {:.6}", total);
    println!();
    println!(
        "Time: {:.3}s ({:.1} steps/s)",
        elapsed.as_secs_f64(),
        steps as f64 / elapsed.as_secs_f64()
    );

    if let Some(prefix) = canvas_prefix {
        write_canvases(&prefix, &reports);
    }
}

#[cfg(feature = "mpi")]
fn run_mpi(config: &SolverConfig, steps: u64, canvas_prefix: Option<&Path>) {
    use stencil_chain::compute::{Communicator, MpiWorld};

    let max_variables = config.operator.output_variables(config.variables).max(config.variables);
    let world = MpiWorld::initialize(max_variables).unwrap_or_else(|e| {
        eprintln!("MPI failure: {}", e);
        std::process::exit(1);
    });
    let comm = world.comm();
    if comm.size() != config.ranks {
        log::warn!(
            "config asks for {} ranks, running on {} MPI processes",
            config.ranks,
            comm.size()
        );
    }

    let start = Instant::now();
    let report = run_rank(&comm, config, steps).unwrap_or_else(|e| {
        eprintln!("Rank {} failed: {}", comm.rank(), e);
        std::process::exit(1);
    });
    print_report(&report);
    println!(
        "  rank {} time: {:.3}s",
        comm.rank(),
        start.elapsed().as_secs_f64()
    );

    if let Some(prefix) = canvas_prefix {
        write_canvases(prefix, std::slice::from_ref(&report));
    }
}

#[cfg(not(feature = "mpi"))]
fn run_mpi(_config: &SolverConfig, _steps: u64, _canvas_prefix: Option<&Path>) {
    eprintln!("--mpi requires building with the `mpi` feature");
    std::process::exit(1);
}

fn print_report(report: &RankReport) {
    println!(
        "  rank {} [{:.4}, {:.4}]: min={:?} max={:?} sum={:?}",
        report.stats.rank,
        report.x_range.0,
        report.x_range.1,
        report.stats.min,
        report.stats.max,
        report.stats.sum
    );
}

fn write_canvases(prefix: &Path, reports: &[RankReport]) {
    for report in reports {
        let path = rank_path(prefix, report.stats.rank);
        if let Err(e) = report.canvas.write_json(&path) {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!("Wrote {}", path.display());
    }
}

fn print_example_config() {
    let config = SolverConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
