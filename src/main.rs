use std::path::Path;
use std::time::Instant;

use clap::Parser;
use RegionCut::algorithms::{Error, GlobalSearch, LocalOptimization};
use RegionCut::gen_attrs::{gen_random_attrs, gen_uniform_attrs};
use RegionCut::graph::AreaGraph;
use RegionCut::imbalance::imbalance;
use RegionCut::io::{read_matrix_market_as_neighbors, write_solution_json, Solution};
use RegionCut::validator::check_partition;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the .mtx adjacency file
    mtx_filepath: String,

    /// Number of regions
    num_of_regions: usize,

    /// Minimum extensive attribute per region (0 for the classic case)
    threshold: i64,

    /// Filename where the solution mapping can be stored
    solution_file: String,

    /// Seed for the run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of seed-identification rounds
    #[arg(long, default_value_t = 64)]
    seed_rounds: usize,

    /// Number of non-improving refinement steps before stopping
    #[arg(short, long, default_value_t = 100)]
    max_no_improve: u32,

    /// Refinement cooling factor
    #[arg(short, long, default_value_t = 0.99)]
    alpha: f64,

    /// Largest random internal attribute
    #[arg(long, default_value_t = 100)]
    max_internal_attr: i64,

    /// Report per-phase progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let neighbors = read_matrix_market_as_neighbors(Path::new(&args.mtx_filepath))?;
    let num_of_areas = neighbors.len();
    let graph = AreaGraph::from_parts(
        neighbors,
        gen_uniform_attrs(num_of_areas),
        gen_random_attrs(num_of_areas, 1, args.max_internal_attr),
    )?;
    let extensive_attrs = graph.extensive_attrs();

    let search = GlobalSearch {
        num_of_regions: args.num_of_regions,
        threshold: args.threshold,
        seed_iteration_budget: args.seed_rounds,
        seed: args.seed,
        verbose: args.verbose,
        ..Default::default()
    };

    let start = Instant::now();
    let outcome = search.run(&graph)?;
    if !outcome.solved {
        eprintln!("no feasible partition into {} regions found", args.num_of_regions);
        return Err(Error::NoFeasiblePartition.into());
    }

    let mut run_graph = outcome.graph;
    let mut regions = outcome.regions;
    if let Err(violations) = check_partition(&run_graph, &regions, args.threshold, true) {
        for violation in &violations {
            eprintln!("{violation}");
        }
        return Err("constructive search produced an invalid partition".into());
    }

    let optimizer = LocalOptimization {
        max_no_improve: args.max_no_improve,
        alpha: args.alpha,
        threshold: args.threshold,
        seed: args.seed,
    };
    let summary = optimizer.refine(&mut run_graph, &mut regions)?;
    if let Err(violations) = check_partition(&run_graph, &regions, args.threshold, true) {
        for violation in &violations {
            eprintln!("{violation}");
        }
        return Err("refinement produced an invalid partition".into());
    }
    let elapsed_time = start.elapsed();

    let solution = Solution::from_regions(&regions);
    write_solution_json(&solution, &args.solution_file)?;
    let labels = solution.into_labels(num_of_areas)?;

    println!("Seed quality {:?}", outcome.seed_quality);
    println!("Seed identification {:?}", outcome.timings.seed_identification);
    println!("Region growth {:?}", outcome.timings.region_growth);
    println!("Enclave assignment {:?}", outcome.timings.enclave_assignment);
    if args.threshold > 0 {
        println!("Inter-region update {:?}", outcome.timings.interregion_update);
        println!("Indirect flow push {:?}", outcome.timings.indirect_flow_push);
    }
    println!("Initial heterogeneity {:?}", summary.initial_hetero);
    println!("Best heterogeneity {:?}", summary.best_hetero);
    println!("Local optimization {:?}", summary.total_time);
    println!(
        "Extensive imbalance {:?}",
        imbalance(args.num_of_regions, &labels, &extensive_attrs)
    );
    println!("Execution time {:?}", elapsed_time);
    Ok(())
}
