use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::algorithm::utility::find_local_maxima_mask;
use crate::errors::EstimationError;

/// Minimum normalized autocorrelation a lag must reach to count as a peak.
pub const MIN_PEAK_HEIGHT: f64 = 0.4;

/// Relative deviation from the running mean spacing below which an
/// autocorrelation peak is accepted as another repeat of the period.
pub const SPACING_TOLERANCE: f64 = 0.05;

const MIN_SIGNAL_LENGTH: usize = 20;

/// Advisory estimate of the modulation period expressed in scans.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PeriodEstimate {
    pub scans_per_modulation: usize,
    pub peak_lags: Vec<usize>,
    pub mean_spacing: f64,
}

impl PeriodEstimate {
    /// Estimated modulation period in seconds for a given scan rate.
    pub fn modulation_time(&self, scan_rate: f64) -> f64 {
        self.scans_per_modulation as f64 / scan_rate
    }
}

/// Normalized autocorrelation of a signal for lags `0..=max_lag`. The
/// signal is mean-centered and normalized by the zero-lag energy, a flat
/// signal yields all zeros.
pub fn autocorrelation(values: &[f64], max_lag: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let max_lag = max_lag.min(n - 1);

    let mean = values.iter().mean();
    let centered: Vec<f64> = values.iter().map(|value| value - mean).collect();
    let series = DVector::from_column_slice(&centered);
    let denominator = series.dot(&series);
    if denominator == 0.0 {
        return vec![0.0; max_lag + 1];
    }

    let mut correlations = Vec::with_capacity(max_lag + 1);
    for lag in 0..=max_lag {
        let head = DVector::from_column_slice(&centered[..n - lag]);
        let tail = DVector::from_column_slice(&centered[lag..]);
        correlations.push(head.dot(&tail) / denominator);
    }
    correlations
}

// walk candidate lags in ascending order and keep the ones whose spacing
// stays within tolerance of the running mean spacing, the first candidate
// seeds the mean with its distance from lag zero
fn accept_evenly_spaced(lags: &[usize], tolerance: f64) -> (Vec<usize>, f64) {
    let mut accepted: Vec<usize> = Vec::new();
    let mut spacings: Vec<f64> = Vec::new();

    for &lag in lags {
        match accepted.last() {
            None => {
                accepted.push(lag);
                spacings.push(lag as f64);
            }
            Some(&previous) => {
                let spacing = (lag - previous) as f64;
                let mean_spacing = spacings.iter().sum::<f64>() / spacings.len() as f64;
                if (spacing - mean_spacing).abs() <= tolerance * mean_spacing {
                    accepted.push(lag);
                    spacings.push(spacing);
                }
            }
        }
    }

    let mean_spacing = if spacings.is_empty() {
        0.0
    } else {
        spacings.iter().sum::<f64>() / spacings.len() as f64
    };
    (accepted, mean_spacing)
}

/// Estimate the number of scans per modulation from a total ion current.
///
/// The TIC of a modulated chromatogram repeats with the modulation period,
/// so the dominant spacing of its autocorrelation maxima recovers the
/// period without any instrument metadata. The estimate is advisory, every
/// failure is recoverable and reported as an [`EstimationError`].
///
/// # Arguments
///
/// * `tic` - total ion current per scan, acquisition order.
pub fn estimate_scans_per_modulation(tic: &[f64]) -> Result<PeriodEstimate, EstimationError> {
    if tic.len() < MIN_SIGNAL_LENGTH {
        return Err(EstimationError::SignalTooShort(tic.len()));
    }

    let max_lag = tic.len() / 10;
    let correlations = autocorrelation(tic, max_lag);
    let mask = find_local_maxima_mask(&correlations, 1);

    // lag zero is the trivial global maximum and never a candidate
    let candidates: Vec<usize> = (1..correlations.len())
        .filter(|&lag| mask[lag] && correlations[lag] >= MIN_PEAK_HEIGHT)
        .collect();
    if candidates.is_empty() {
        return Err(EstimationError::NoPeaks(MIN_PEAK_HEIGHT));
    }

    let (accepted, mean_spacing) = accept_evenly_spaced(&candidates, SPACING_TOLERANCE);
    if accepted.len() < 2 {
        return Err(EstimationError::UnstableSpacing);
    }

    let scans_per_modulation = mean_spacing.round() as usize;
    if scans_per_modulation == 0 {
        return Err(EstimationError::UnstableSpacing);
    }

    Ok(PeriodEstimate {
        scans_per_modulation,
        peak_lags: accepted,
        mean_spacing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn periodic_tic(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 10.0 + 5.0 * (2.0 * PI * i as f64 / period as f64).cos())
            .collect()
    }

    #[test]
    fn autocorrelation_is_one_at_lag_zero() {
        let correlations = autocorrelation(&periodic_tic(200, 20), 40);
        assert_eq!(correlations.len(), 41);
        assert!((correlations[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn autocorrelation_of_flat_signal_is_zero() {
        let correlations = autocorrelation(&vec![7.0; 100], 10);
        assert!(correlations.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn periodic_signal_recovers_its_period() {
        let estimate = estimate_scans_per_modulation(&periodic_tic(400, 20)).unwrap();
        assert_eq!(estimate.scans_per_modulation, 20);
        assert_eq!(estimate.peak_lags, vec![20, 40]);
        assert!((estimate.modulation_time(50.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn shorter_period_recovers_too() {
        let estimate = estimate_scans_per_modulation(&periodic_tic(300, 10)).unwrap();
        assert_eq!(estimate.scans_per_modulation, 10);
        assert_eq!(estimate.peak_lags, vec![10, 20, 30]);
    }

    #[test]
    fn short_signal_is_rejected() {
        assert_eq!(
            estimate_scans_per_modulation(&[1.0; 10]),
            Err(EstimationError::SignalTooShort(10))
        );
    }

    #[test]
    fn flat_signal_has_no_peaks() {
        assert_eq!(
            estimate_scans_per_modulation(&[3.0; 100]),
            Err(EstimationError::NoPeaks(MIN_PEAK_HEIGHT))
        );
    }

    #[test]
    fn spacing_filter_keeps_regular_peaks() {
        let (accepted, mean_spacing) = accept_evenly_spaced(&[20, 40, 61], SPACING_TOLERANCE);
        assert_eq!(accepted, vec![20, 40, 61]);
        assert!((mean_spacing - 61.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn spacing_filter_drops_irregular_peaks() {
        let (accepted, _) = accept_evenly_spaced(&[10, 25, 33], SPACING_TOLERANCE);
        assert_eq!(accepted, vec![10]);
    }
}
