use gcxcore::data::spectrum::{MassSpectrum, Scan};
use rand::distributions::{Distribution, Uniform};

use crate::data::meta::{MODULATION_TIME, SCAN_ACQUISITION_TIME, SCAN_RATE, TOTAL_INTENSITY};
use crate::data::store::{InMemoryScanStore, StoredChromatogram};
use crate::sim::containers::{ChromatogramSim, PeakSim};

// contributions below this fraction of the peak intensity are not emitted
const MIN_RELATIVE_CONTRIBUTION: f64 = 1e-3;

/// Materializes simulated chromatograms into an in-memory scan store, the
/// source side of a conversion without any instrument files.
#[derive(Debug, Clone)]
pub struct SyntheticDataHandle {
    pub chromatograms: Vec<ChromatogramSim>,
}

impl SyntheticDataHandle {
    pub fn new(chromatograms: Vec<ChromatogramSim>) -> Self {
        SyntheticDataHandle { chromatograms }
    }

    /// Deterministic two-peak layout behind the command line demo, `count`
    /// copies named `sim1`, `sim2`, ...
    pub fn example(count: usize) -> Self {
        let chromatograms = (0..count)
            .map(|i| {
                let id = format!("sim{}", i + 1);
                ChromatogramSim::new(
                    &id,
                    10.0,
                    2.0,
                    40,
                    50.0,
                    250.0,
                    2.0,
                    0.0,
                    0.0,
                    vec![
                        PeakSim::new(122.1, 500.0, 24.0, 0.8, 6.0, 0.12),
                        PeakSim::new(207.3, 320.0, 48.0, 1.3, 8.0, 0.2),
                    ],
                )
            })
            .collect();
        SyntheticDataHandle::new(chromatograms)
    }

    /// Render every simulated chromatogram into a stored scan stream.
    pub fn build_store(&self) -> InMemoryScanStore {
        let mut store = InMemoryScanStore::new();
        for chromatogram in self.chromatograms.iter() {
            store.insert(&chromatogram.id, Self::build_chromatogram(chromatogram));
        }
        store
    }

    fn build_chromatogram(sim: &ChromatogramSim) -> StoredChromatogram {
        let mut rng = rand::thread_rng();
        let scans_per_modulation = sim.scans_per_modulation();
        let count = sim.scan_count();

        let mut scans = Vec::with_capacity(count);
        let mut times = Vec::with_capacity(count);
        let mut tic = Vec::with_capacity(count);

        for index in 0..count {
            let acquisition_time = index as f64 / sim.scan_rate;
            let first_column_time = (index / scans_per_modulation) as f64 * sim.modulation_time;
            let second_column_time = (index % scans_per_modulation) as f64 / sim.scan_rate;

            // background ions anchor the global mass range in every scan
            let mut points: Vec<(f64, f64)> = vec![
                (sim.min_mass, sim.baseline),
                (sim.max_mass, sim.baseline),
            ];

            for peak in sim.peaks.iter() {
                let contribution = peak.contribution(first_column_time, second_column_time);
                if contribution < peak.intensity * MIN_RELATIVE_CONTRIBUTION {
                    continue;
                }
                let mass = if sim.mass_jitter > 0.0 {
                    let jitter = Uniform::new(-sim.mass_jitter, sim.mass_jitter);
                    peak.mass + jitter.sample(&mut rng)
                } else {
                    peak.mass
                };
                let intensity = if sim.noise_level > 0.0 {
                    let noise = Uniform::new(0.0, sim.noise_level);
                    contribution * (1.0 + noise.sample(&mut rng))
                } else {
                    contribution
                };
                points.push((mass, intensity));
            }

            points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
            let (mass, intensity): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();

            tic.push(intensity.iter().sum());
            times.push(acquisition_time);
            scans.push(Scan::new(
                index,
                acquisition_time,
                MassSpectrum::new(mass, intensity),
            ));
        }

        StoredChromatogram::new(scans)
            .with_scalar(SCAN_RATE, sim.scan_rate)
            .with_scalar(MODULATION_TIME, sim.modulation_time)
            .with_vector(SCAN_ACQUISITION_TIME, times)
            .with_vector(TOTAL_INTENSITY, tic)
    }
}
