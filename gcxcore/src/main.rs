use gcxcore::algorithm::period::estimate_scans_per_modulation;
use gcxcore::algorithm::statistics::MeanVarianceAccumulator;

fn main() {
    // synthetic TIC with a 20 scan period
    let tic: Vec<f64> = (0..400)
        .map(|i| 10.0 + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 20.0).cos())
        .collect();

    match estimate_scans_per_modulation(&tic) {
        Ok(estimate) => {
            println!("Scans per modulation: {}", estimate.scans_per_modulation);
            println!("Accepted peak lags: {:?}", estimate.peak_lags);
        }
        Err(error) => println!("Estimation failed: {}", error),
    }

    let mut accumulator = MeanVarianceAccumulator::new();
    for &value in tic.iter() {
        accumulator.add(value);
    }
    println!("TIC mean: {}", accumulator.mean());
    println!("TIC standard deviation: {}", accumulator.standard_deviation());
}
