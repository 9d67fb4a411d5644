use serde::{Deserialize, Serialize};

/// Unit-height gaussian profile at `x` for a peak centered on `mu`.
/// `sigma` must be positive.
pub fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp()
}

/// One simulated peak, an ion with gaussian profiles on both elution axes.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PeakSim {
    pub mass: f64,
    pub intensity: f64,
    pub first_column_time: f64,
    pub second_column_time: f64,
    pub first_column_sigma: f64,
    pub second_column_sigma: f64,
}

impl PeakSim {
    pub fn new(
        mass: f64,
        intensity: f64,
        first_column_time: f64,
        second_column_time: f64,
        first_column_sigma: f64,
        second_column_sigma: f64,
    ) -> Self {
        PeakSim {
            mass,
            intensity,
            first_column_time,
            second_column_time,
            first_column_sigma,
            second_column_sigma,
        }
    }

    /// Intensity this peak contributes at a point on both elution axes.
    pub fn contribution(&self, first_column_time: f64, second_column_time: f64) -> f64 {
        self.intensity
            * gaussian(first_column_time, self.first_column_time, self.first_column_sigma)
            * gaussian(second_column_time, self.second_column_time, self.second_column_sigma)
    }
}

/// Layout of one simulated chromatogram. `baseline` is the intensity of the
/// two background ions pinned at the mass range edges, `noise_level` and
/// `mass_jitter` are uniform perturbation widths, zero disables them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChromatogramSim {
    pub id: String,
    pub scan_rate: f64,
    pub modulation_time: f64,
    pub modulation_count: usize,
    pub min_mass: f64,
    pub max_mass: f64,
    pub baseline: f64,
    pub noise_level: f64,
    pub mass_jitter: f64,
    pub peaks: Vec<PeakSim>,
}

impl ChromatogramSim {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        scan_rate: f64,
        modulation_time: f64,
        modulation_count: usize,
        min_mass: f64,
        max_mass: f64,
        baseline: f64,
        noise_level: f64,
        mass_jitter: f64,
        peaks: Vec<PeakSim>,
    ) -> Self {
        ChromatogramSim {
            id: id.to_string(),
            scan_rate,
            modulation_time,
            modulation_count,
            min_mass,
            max_mass,
            baseline,
            noise_level,
            mass_jitter,
            peaks,
        }
    }

    pub fn scans_per_modulation(&self) -> usize {
        (self.scan_rate * self.modulation_time).round() as usize
    }

    pub fn scan_count(&self) -> usize {
        self.modulation_count * self.scans_per_modulation()
    }
}
