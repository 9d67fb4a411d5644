use serde::{Deserialize, Serialize};

use crate::data::spectrum::DenseSpectrum;
use crate::errors::GcxError;
use crate::gcxgc::scanline::{LineStore, ScanlineCache};

/// Streaming estimator of mean and variance after Welford. Values are
/// folded in one at a time, nothing but the running moments is retained,
/// so whole chromatograms can be summarized in a single forward pass.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MeanVarianceAccumulator {
    pub count: u64,
    pub mean: f64,
    pub m2: f64,
}

impl MeanVarianceAccumulator {
    pub fn new() -> Self {
        MeanVarianceAccumulator::default()
    }

    /// Fold one observation into the running moments.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gcxcore::algorithm::statistics::MeanVarianceAccumulator;
    /// let mut acc = MeanVarianceAccumulator::new();
    /// for value in [2.0, 4.0, 6.0] {
    ///     acc.add(value);
    /// }
    /// assert!((acc.mean() - 4.0).abs() < 1e-12);
    /// assert!((acc.variance() - 4.0).abs() < 1e-12);
    /// ```
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance, zero until at least two observations were seen.
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Per-channel moments of a conversion, one vector per statistic over the
/// full bin layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelMoments {
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
    pub standard_deviation: Vec<f64>,
}

/// One accumulator per mass channel. Dense scans are folded in row by row,
/// the summary never holds more than the accumulators themselves.
#[derive(Clone, Debug)]
pub struct ChannelStatistics {
    pub accumulators: Vec<MeanVarianceAccumulator>,
}

impl ChannelStatistics {
    pub fn new(num_channels: usize) -> Self {
        ChannelStatistics {
            accumulators: vec![MeanVarianceAccumulator::new(); num_channels],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.accumulators.len()
    }

    pub fn accumulate(&mut self, channel: usize, value: f64) {
        self.accumulators[channel].add(value);
    }

    /// Fold a full dense row, one value per channel.
    pub fn accumulate_row(&mut self, values: &[f64]) {
        assert_eq!(values.len(), self.accumulators.len());
        for (accumulator, &value) in self.accumulators.iter_mut().zip(values.iter()) {
            accumulator.add(value);
        }
    }

    pub fn accumulate_spectrum(&mut self, spectrum: &DenseSpectrum) {
        self.accumulate_row(&spectrum.intensity);
    }

    pub fn means(&self) -> Vec<f64> {
        self.accumulators.iter().map(|a| a.mean()).collect()
    }

    pub fn variances(&self) -> Vec<f64> {
        self.accumulators.iter().map(|a| a.variance()).collect()
    }

    pub fn standard_deviations(&self) -> Vec<f64> {
        self.accumulators.iter().map(|a| a.standard_deviation()).collect()
    }

    pub fn finalize(&self) -> ChannelMoments {
        ChannelMoments {
            mean: self.means(),
            variance: self.variances(),
            standard_deviation: self.standard_deviations(),
        }
    }

    /// Summarize a cached chromatogram, folding every scan line by line.
    pub fn from_scanline_cache<S: LineStore>(
        cache: &mut ScanlineCache<S>,
    ) -> Result<Self, GcxError> {
        let mut statistics = ChannelStatistics::new(cache.bins_size());
        for index in 0..cache.scan_line_count() {
            for spectrum in cache.scanline(index)? {
                statistics.accumulate_spectrum(&spectrum);
            }
        }
        Ok(statistics)
    }
}
