use clap::Parser;

use gcxcore::algorithm::binning::RoundingPolicy;
use rustcdf::convert::batch::{batch_report, convert_batch, ConversionJob};
use rustcdf::convert::pipeline::ConversionConfig;
use rustcdf::sim::handle::SyntheticDataHandle;

#[derive(Parser, Debug)]
#[command(version, about = "Convert simulated GCxGC-MS runs into the 2D layout", long_about = None)]
struct Cli {
    /// Number of simulated chromatograms to convert
    #[arg(short, long, default_value_t = 2)]
    chromatograms: usize,

    /// Worker threads for the batch
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Bins per mass unit
    #[arg(short, long, default_value_t = 1.0)]
    resolution: f64,

    /// Rounding policy for mass binning (nearest, down, heiko)
    #[arg(long, default_value_t = RoundingPolicy::Down)]
    policy: RoundingPolicy,

    /// Average colliding points instead of summing them
    #[arg(long)]
    average: bool,

    /// Override the modulation time in seconds
    #[arg(long)]
    modulation_time: Option<f64>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let handle = SyntheticDataHandle::example(cli.chromatograms);
    let store = handle.build_store();

    let jobs: Vec<ConversionJob> = handle
        .chromatograms
        .iter()
        .map(|sim| ConversionJob::new(&format!("{}_2d", sim.id), vec![sim.id.clone()]))
        .collect();

    let config = ConversionConfig {
        modulation_time: cli.modulation_time,
        mass_resolution: cli.resolution,
        rounding_policy: cli.policy,
        average_overlaps: cli.average,
        num_threads: cli.threads,
        ..ConversionConfig::default()
    };

    let results = convert_batch(&store, &jobs, &config);
    let report = batch_report(&results);
    println!("{}", report.to_json().unwrap());

    if report.failure_count() > 0 {
        std::process::exit(1);
    }
}
