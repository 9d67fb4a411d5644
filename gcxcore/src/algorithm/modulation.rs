use statrs::statistics::Statistics;

use crate::errors::{ConfigurationError, GcxError, LayoutError};

/// Default upper bound on the standard deviation of scan intervals when a
/// scan rate is inferred from acquisition timestamps.
pub const DEFAULT_DELTA_TOLERANCE: f64 = 1e-4;

/// Number of scans that make up one modulation.
///
/// # Arguments
///
/// * `scan_rate` - detector scans per second, must be positive.
/// * `modulation_time` - modulation period in seconds, must be positive.
///
/// # Examples
///
/// ```
/// # use gcxcore::algorithm::modulation::scans_per_modulation;
/// assert_eq!(scans_per_modulation(50.0, 4.0).unwrap(), 200);
/// assert_eq!(scans_per_modulation(49.9, 4.0).unwrap(), 200);
/// ```
pub fn scans_per_modulation(
    scan_rate: f64,
    modulation_time: f64,
) -> Result<usize, ConfigurationError> {
    if !(modulation_time > 0.0) {
        return Err(ConfigurationError::NonPositiveModulationTime(modulation_time));
    }
    if !(scan_rate > 0.0) {
        return Err(ConfigurationError::NonPositiveScanRate(scan_rate));
    }
    let scans = (scan_rate * modulation_time).round();
    if scans < 1.0 {
        return Err(ConfigurationError::EmptyModulation {
            scan_rate,
            modulation_time,
        });
    }
    Ok(scans as usize)
}

/// Split a scan-ordered sequence into consecutive chunks of one modulation
/// each. A trailing remainder that does not fill a whole modulation is
/// dropped and logged once.
///
/// # Arguments
///
/// * `values` - per-scan values in acquisition order.
/// * `scans_per_modulation` - chunk length, must be positive.
///
/// # Examples
///
/// ```
/// # use gcxcore::algorithm::modulation::segment;
/// let chunks = segment(&[1, 2, 3, 4, 5], 2);
/// assert_eq!(chunks, vec![vec![1, 2], vec![3, 4]]);
/// ```
pub fn segment<T: Clone>(values: &[T], scans_per_modulation: usize) -> Vec<Vec<T>> {
    assert!(scans_per_modulation > 0);
    let complete = values.len() / scans_per_modulation;
    let remainder = values.len() % scans_per_modulation;
    if remainder > 0 {
        log::warn!(
            "dropping {} trailing scans that do not fill a modulation of {} scans",
            remainder,
            scans_per_modulation
        );
    }
    (0..complete)
        .map(|i| values[i * scans_per_modulation..(i + 1) * scans_per_modulation].to_vec())
        .collect()
}

/// Mean spacing of acquisition timestamps. Only accepted when the spacing
/// is regular, irregular intervals mean the stream has no single scan rate
/// and downstream reshaping would silently shear.
///
/// # Arguments
///
/// * `times` - acquisition timestamps, non-decreasing.
/// * `tolerance` - maximum standard deviation of the intervals.
pub fn mean_scan_interval(times: &[f64], tolerance: f64) -> Result<f64, GcxError> {
    if times.len() < 2 {
        return Err(ConfigurationError::TooFewTimestamps(times.len()).into());
    }

    for (index, window) in times.windows(2).enumerate() {
        if window[1] < window[0] {
            return Err(LayoutError::UnsortedAcquisitionTimes {
                index: index + 1,
                previous: window[0],
                current: window[1],
            }
            .into());
        }
    }

    let deltas: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = deltas.iter().mean();
    let sd = if deltas.len() > 1 { deltas.iter().std_dev() } else { 0.0 };

    if sd > tolerance {
        return Err(ConfigurationError::IrregularScanIntervals { sd, tolerance }.into());
    }

    Ok(mean)
}

/// Scan rate inferred from acquisition timestamps, the reciprocal of the
/// accepted mean interval.
pub fn infer_scan_rate(times: &[f64], tolerance: f64) -> Result<f64, GcxError> {
    let interval = mean_scan_interval(times, tolerance)?;
    if !(interval > 0.0) {
        return Err(ConfigurationError::NonPositiveScanRate(interval).into());
    }
    Ok(1.0 / interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_per_modulation_rounds_to_nearest() {
        assert_eq!(scans_per_modulation(50.0, 4.0).unwrap(), 200);
        assert_eq!(scans_per_modulation(50.1, 4.0).unwrap(), 200);
        assert_eq!(scans_per_modulation(49.9, 4.0).unwrap(), 200);
        assert_eq!(scans_per_modulation(0.3, 2.0).unwrap(), 1);
    }

    #[test]
    fn scans_per_modulation_rejects_bad_parameters() {
        assert!(matches!(
            scans_per_modulation(50.0, 0.0),
            Err(ConfigurationError::NonPositiveModulationTime(_))
        ));
        assert!(matches!(
            scans_per_modulation(-1.0, 4.0),
            Err(ConfigurationError::NonPositiveScanRate(_))
        ));
        assert!(matches!(
            scans_per_modulation(0.1, 2.0),
            Err(ConfigurationError::EmptyModulation { .. })
        ));
    }

    #[test]
    fn segment_produces_complete_chunks() {
        let values: Vec<usize> = (0..12).collect();
        let chunks = segment(&values, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], vec![0, 1, 2, 3]);
        assert_eq!(chunks[2], vec![8, 9, 10, 11]);
    }

    #[test]
    fn segment_drops_trailing_remainder() {
        let values: Vec<usize> = (0..14).collect();
        let chunks = segment(&values, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.last().unwrap(), &vec![8, 9, 10, 11]);
    }

    #[test]
    fn segment_of_short_input_is_empty() {
        let chunks = segment(&[1.0, 2.0, 3.0], 4);
        assert!(chunks.is_empty());
    }

    #[test]
    fn regular_intervals_yield_scan_rate() {
        let times: Vec<f64> = (0..100).map(|i| i as f64 * 0.02).collect();
        let interval = mean_scan_interval(&times, DEFAULT_DELTA_TOLERANCE).unwrap();
        assert!((interval - 0.02).abs() < 1e-9);
        let rate = infer_scan_rate(&times, DEFAULT_DELTA_TOLERANCE).unwrap();
        assert!((rate - 50.0).abs() < 1e-6);
    }

    #[test]
    fn irregular_intervals_are_rejected() {
        let times = vec![0.0, 0.02, 0.05, 0.057, 0.12];
        let result = mean_scan_interval(&times, DEFAULT_DELTA_TOLERANCE);
        assert!(matches!(
            result,
            Err(GcxError::Configuration(
                ConfigurationError::IrregularScanIntervals { .. }
            ))
        ));
    }

    #[test]
    fn decreasing_timestamps_are_a_layout_error() {
        let times = vec![0.0, 0.02, 0.01, 0.06];
        let result = mean_scan_interval(&times, DEFAULT_DELTA_TOLERANCE);
        assert!(matches!(
            result,
            Err(GcxError::Layout(LayoutError::UnsortedAcquisitionTimes {
                index: 2,
                ..
            }))
        ));
    }

    #[test]
    fn single_interval_is_accepted() {
        let interval = mean_scan_interval(&[1.0, 1.5], DEFAULT_DELTA_TOLERANCE).unwrap();
        assert!((interval - 0.5).abs() < 1e-12);
    }

    #[test]
    fn too_few_timestamps_are_rejected() {
        assert!(matches!(
            mean_scan_interval(&[1.0], DEFAULT_DELTA_TOLERANCE),
            Err(GcxError::Configuration(ConfigurationError::TooFewTimestamps(1)))
        ));
    }
}
