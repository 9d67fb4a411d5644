use serde::{Deserialize, Serialize};

use crate::errors::{ConfigurationError, LayoutError};

/// Timing coordinates of one scan after projection onto the two
/// chromatographic axes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScanTiming {
    /// Position on the global run clock.
    pub global_scan_time: f64,
    /// Retention time on the first column, the start of the scan's
    /// modulation.
    pub first_column_time: f64,
    /// Elapsed time inside the modulation, the second-column axis.
    pub second_column_time: f64,
    /// Whether this scan opened a new modulation.
    pub starts_modulation: bool,
}

/// Mutable clock state of the 1D to 2D projection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModulationBoundaryState {
    pub local_scan_time: f64,
    pub local_modulation_start_time: f64,
    pub global_modulation_start_time: f64,
    pub global_scan_time: f64,
    pub scans_in_modulation: usize,
}

/// Projects a stream of acquisition timestamps onto first-column and
/// second-column retention times.
///
/// The mapper is fed scans in acquisition order and advances a modulation
/// clock: once the time since the current modulation start reaches the
/// modulation period, the global clock jumps forward by the elapsed span
/// and a new modulation begins with the triggering scan. Between sources of
/// one chromatogram, [`TimelineMapper::begin_source`] re-bases the local
/// clock so per-source timestamps may restart at zero while global times
/// stay non-decreasing over the concatenated stream.
#[derive(Clone, Debug)]
pub struct TimelineMapper {
    modulation_time: f64,
    state: Option<ModulationBoundaryState>,
    rebase_pending: bool,
    previous_time: Option<f64>,
    scans: usize,
    modulations: usize,
}

impl TimelineMapper {
    /// # Arguments
    ///
    /// * `modulation_time` - modulation period in seconds, must be positive.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gcxcore::gcxgc::timing::TimelineMapper;
    /// let mut mapper = TimelineMapper::new(4.0).unwrap();
    /// let timing = mapper.step(0.0).unwrap();
    /// assert_eq!(timing.first_column_time, 0.0);
    /// let timing = mapper.step(10.0).unwrap();
    /// assert_eq!(timing.first_column_time, 10.0);
    /// assert_eq!(timing.second_column_time, 0.0);
    /// ```
    pub fn new(modulation_time: f64) -> Result<Self, ConfigurationError> {
        if !(modulation_time > 0.0) {
            return Err(ConfigurationError::NonPositiveModulationTime(modulation_time));
        }
        Ok(TimelineMapper {
            modulation_time,
            state: None,
            rebase_pending: false,
            previous_time: None,
            scans: 0,
            modulations: 0,
        })
    }

    /// Announce that the following scans come from a new source file whose
    /// acquisition clock may have restarted.
    pub fn begin_source(&mut self) {
        self.rebase_pending = true;
    }

    /// Advance the clocks by one scan.
    ///
    /// Timestamps must not decrease within a source, a regression is a
    /// fatal layout error. Regressions across a `begin_source` boundary are
    /// expected and absorbed by re-basing the local clock.
    pub fn step(&mut self, acquisition_time: f64) -> Result<ScanTiming, LayoutError> {
        let state = match self.state.as_mut() {
            Some(state) => state,
            None => {
                // very first scan of the run opens the first modulation
                self.state = Some(ModulationBoundaryState {
                    local_scan_time: 0.0,
                    local_modulation_start_time: acquisition_time,
                    global_modulation_start_time: acquisition_time,
                    global_scan_time: acquisition_time,
                    scans_in_modulation: 1,
                });
                self.rebase_pending = false;
                self.previous_time = Some(acquisition_time);
                self.scans = 1;
                self.modulations = 1;
                return Ok(ScanTiming {
                    global_scan_time: acquisition_time,
                    first_column_time: acquisition_time,
                    second_column_time: 0.0,
                    starts_modulation: true,
                });
            }
        };

        if self.rebase_pending {
            state.local_modulation_start_time = acquisition_time;
            self.previous_time = None;
            self.rebase_pending = false;
        }

        if let Some(previous) = self.previous_time {
            if acquisition_time < previous {
                return Err(LayoutError::UnsortedAcquisitionTimes {
                    index: self.scans,
                    previous,
                    current: acquisition_time,
                });
            }
        }
        self.previous_time = Some(acquisition_time);
        self.scans += 1;

        let elapsed = acquisition_time - state.local_modulation_start_time;
        let starts_modulation = if elapsed >= self.modulation_time {
            // close the modulation: jump the global clock by the elapsed
            // span and let this scan open the next one
            state.global_modulation_start_time += elapsed;
            state.local_scan_time = 0.0;
            state.global_scan_time = state.global_modulation_start_time;
            state.local_modulation_start_time = acquisition_time;
            state.scans_in_modulation = 0;
            self.modulations += 1;
            true
        } else {
            state.local_scan_time = elapsed;
            state.global_scan_time = state.global_modulation_start_time + elapsed;
            state.scans_in_modulation += 1;
            false
        };

        Ok(ScanTiming {
            global_scan_time: state.global_scan_time,
            first_column_time: state.global_modulation_start_time,
            second_column_time: state.local_scan_time,
            starts_modulation,
        })
    }

    /// Number of scans stepped so far.
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Number of modulations opened so far.
    pub fn modulation_count(&self) -> usize {
        self.modulations
    }

    pub fn state(&self) -> Option<&ModulationBoundaryState> {
        self.state.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(mapper: &mut TimelineMapper, times: &[f64]) -> Vec<ScanTiming> {
        times
            .iter()
            .map(|&time| mapper.step(time).unwrap())
            .collect()
    }

    #[test]
    fn rejects_non_positive_modulation_time() {
        assert!(matches!(
            TimelineMapper::new(0.0),
            Err(ConfigurationError::NonPositiveModulationTime(_))
        ));
    }

    #[test]
    fn splits_scans_into_columns() {
        let mut mapper = TimelineMapper::new(4.0).unwrap();
        let timings = project(&mut mapper, &[0.0, 1.0, 2.0, 3.0, 10.0, 11.0, 12.0]);

        let first: Vec<f64> = timings.iter().map(|t| t.first_column_time).collect();
        let second: Vec<f64> = timings.iter().map(|t| t.second_column_time).collect();
        assert_eq!(first, vec![0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0]);
        assert_eq!(second, vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0]);
        assert_eq!(mapper.modulation_count(), 2);
    }

    #[test]
    fn boundary_scan_opens_the_modulation() {
        let mut mapper = TimelineMapper::new(4.0).unwrap();
        let timings = project(&mut mapper, &[0.0, 1.0, 2.0, 3.0]);
        assert!(timings[0].starts_modulation);
        assert!(!timings[3].starts_modulation);

        let boundary = mapper.step(4.0).unwrap();
        assert!(boundary.starts_modulation);
        assert_eq!(boundary.second_column_time, 0.0);
        // the opening scan leaves the in-modulation counter at zero
        assert_eq!(mapper.state().unwrap().scans_in_modulation, 0);

        let next = mapper.step(5.0).unwrap();
        assert!(!next.starts_modulation);
        assert_eq!(next.second_column_time, 1.0);
        assert_eq!(mapper.state().unwrap().scans_in_modulation, 1);
    }

    #[test]
    fn global_time_jumps_by_elapsed_span() {
        let mut mapper = TimelineMapper::new(4.0).unwrap();
        let timings = project(&mut mapper, &[0.0, 1.0, 2.0, 3.0, 10.0, 11.0]);
        let global: Vec<f64> = timings.iter().map(|t| t.global_scan_time).collect();
        assert_eq!(global, vec![0.0, 1.0, 2.0, 3.0, 10.0, 11.0]);
    }

    #[test]
    fn concatenated_sources_keep_global_time_non_decreasing() {
        let mut mapper = TimelineMapper::new(1.0).unwrap();
        let mut global: Vec<f64> = Vec::new();

        mapper.begin_source();
        for timing in project(&mut mapper, &[0.0, 1.0, 2.0]) {
            global.push(timing.global_scan_time);
        }
        mapper.begin_source();
        for timing in project(&mut mapper, &[0.0, 1.0]) {
            global.push(timing.global_scan_time);
        }

        assert_eq!(global.len(), 5);
        assert!(global.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(global, vec![0.0, 1.0, 2.0, 2.0, 3.0]);
    }

    #[test]
    fn time_regression_within_a_source_is_fatal() {
        let mut mapper = TimelineMapper::new(4.0).unwrap();
        mapper.step(0.0).unwrap();
        mapper.step(1.0).unwrap();
        let result = mapper.step(0.5);
        assert_eq!(
            result,
            Err(LayoutError::UnsortedAcquisitionTimes {
                index: 2,
                previous: 1.0,
                current: 0.5,
            })
        );
    }

    #[test]
    fn time_regression_across_sources_is_absorbed() {
        let mut mapper = TimelineMapper::new(4.0).unwrap();
        project(&mut mapper, &[100.0, 101.0]);
        mapper.begin_source();
        let timing = mapper.step(0.0).unwrap();
        assert_eq!(timing.second_column_time, 0.0);
        assert_eq!(timing.global_scan_time, 100.0);
    }

    #[test]
    fn equal_timestamps_are_tolerated() {
        let mut mapper = TimelineMapper::new(4.0).unwrap();
        mapper.step(1.0).unwrap();
        let timing = mapper.step(1.0).unwrap();
        assert_eq!(timing.second_column_time, 0.0);
        assert!(!timing.starts_modulation);
    }
}
