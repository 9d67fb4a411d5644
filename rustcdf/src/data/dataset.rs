use gcxcore::algorithm::binning::MassBinner;
use gcxcore::algorithm::modulation::{infer_scan_rate, scans_per_modulation};
use gcxcore::algorithm::period::estimate_scans_per_modulation;
use gcxcore::errors::ConfigurationError;
use gcxcore::gcxgc::chromatogram::Chromatogram1D;
use gcxcore::gcxgc::scanline::{MemoryLineStore, ScanlineCache};

use crate::data::meta::{
    ChromatogramMeta, MODULATION_TIME, SCAN_ACQUISITION_TIME, SCAN_DURATION, SCAN_RATE,
    TOTAL_INTENSITY,
};
use crate::data::store::{ScanStore, SCAN_CHUNK};
use crate::errors::DataError;

/// One chromatogram of a store seen through the resolution rules of a
/// conversion.
///
/// Acquisition parameters are resolved through a fixed chain: an explicit
/// override wins, then the stored scalar, then whatever can be derived from
/// the data itself. Derivations that silently change results are fatal when
/// their preconditions fail, the advisory period estimate is only consulted
/// when explicitly enabled.
pub struct ChromatogramDataset<'a, S: ScanStore> {
    store: &'a S,
    id: String,
}

impl<'a, S: ScanStore> ChromatogramDataset<'a, S> {
    pub fn new(store: &'a S, id: &str) -> Self {
        ChromatogramDataset {
            store,
            id: id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scan_count(&self) -> Result<usize, DataError> {
        self.store.scan_count(&self.id)
    }

    pub fn point_count(&self) -> Result<usize, DataError> {
        self.store.total_point_count(&self.id)
    }

    /// Acquisition timestamps, taken from the stored vector when present
    /// and collected from the scans otherwise.
    pub fn acquisition_times(&self) -> Result<Vec<f64>, DataError> {
        let count = self.store.scan_count(&self.id)?;
        match self.store.vector(&self.id, SCAN_ACQUISITION_TIME) {
            Ok(times) if times.len() == count => return Ok(times),
            Ok(times) => log::debug!(
                "acquisition time vector of '{}' has {} entries for {} scans, reading scans",
                self.id,
                times.len(),
                count
            ),
            Err(DataError::MissingVariable { .. }) => {}
            Err(error) => return Err(error),
        }

        self.times_from_scans(count)
    }

    /// Total ion current per scan. A missing or malformed stored vector is
    /// tolerated and reconstructed from the intensity values.
    pub fn total_intensity(&self) -> Result<Vec<f64>, DataError> {
        let count = self.store.scan_count(&self.id)?;
        match self.store.vector(&self.id, TOTAL_INTENSITY) {
            Ok(values) if values.len() == count => return Ok(values),
            Ok(values) => log::warn!(
                "total intensity of '{}' has {} entries for {} scans, reconstructing from intensity values",
                self.id,
                values.len(),
                count
            ),
            Err(DataError::MissingVariable { .. }) => log::warn!(
                "total intensity missing from '{}', reconstructing from intensity values",
                self.id
            ),
            Err(error) => return Err(error),
        }

        let mut tic = Vec::with_capacity(count);
        let mut start = 0;
        while start < count {
            let len = SCAN_CHUNK.min(count - start);
            for scan in self.store.scan_range(&self.id, start, len)? {
                tic.push(scan.tic());
            }
            start += len;
        }
        Ok(tic)
    }

    /// Resolve the scan rate.
    ///
    /// The chain is override, stored `scan_rate`, reciprocal of a stored
    /// `scan_duration`, and finally the mean acquisition interval. Interval
    /// inference is only accepted when the spacing is regular within
    /// `tolerance`.
    pub fn scan_rate(&self, override_rate: Option<f64>, tolerance: f64) -> Result<f64, DataError> {
        if let Some(rate) = override_rate {
            if !(rate > 0.0) {
                return Err(ConfigurationError::NonPositiveScanRate(rate).into());
            }
            return Ok(rate);
        }

        match self.store.scalar(&self.id, SCAN_RATE) {
            Ok(rate) => {
                if !(rate > 0.0) {
                    return Err(ConfigurationError::NonPositiveScanRate(rate).into());
                }
                return Ok(rate);
            }
            Err(DataError::MissingScalar { .. }) => {}
            Err(error) => return Err(error),
        }

        match self.store.scalar(&self.id, SCAN_DURATION) {
            Ok(duration) => {
                if !(duration > 0.0) {
                    return Err(ConfigurationError::NonPositiveScanRate(duration).into());
                }
                log::debug!("derived scan rate of '{}' from scan duration", self.id);
                return Ok(1.0 / duration);
            }
            Err(DataError::MissingScalar { .. }) => {}
            Err(error) => return Err(error),
        }

        let times = self.acquisition_times()?;
        let rate = infer_scan_rate(&times, tolerance)?;
        log::debug!(
            "inferred scan rate {:.4} Hz of '{}' from acquisition intervals",
            rate,
            self.id
        );
        Ok(rate)
    }

    /// Resolve the modulation time.
    ///
    /// The chain is override, stored `modulation_time`, and optionally the
    /// autocorrelation estimate over the TIC. The estimate is advisory, its
    /// failures are logged and the chromatogram is rejected as missing its
    /// modulation time.
    pub fn modulation_time(
        &self,
        override_time: Option<f64>,
        estimate_missing: bool,
        tolerance: f64,
    ) -> Result<f64, DataError> {
        if let Some(time) = override_time {
            if !(time > 0.0) {
                return Err(ConfigurationError::NonPositiveModulationTime(time).into());
            }
            return Ok(time);
        }

        match self.store.scalar(&self.id, MODULATION_TIME) {
            Ok(time) => {
                if !(time > 0.0) {
                    return Err(ConfigurationError::NonPositiveModulationTime(time).into());
                }
                return Ok(time);
            }
            Err(DataError::MissingScalar { .. }) => {}
            Err(error) => return Err(error),
        }

        if estimate_missing {
            let tic = self.total_intensity()?;
            match estimate_scans_per_modulation(&tic) {
                Ok(estimate) => {
                    let rate = self.scan_rate(None, tolerance)?;
                    let time = estimate.modulation_time(rate);
                    log::warn!(
                        "'{}' has no modulation time, using estimate of {:.3} s ({} scans per modulation)",
                        self.id,
                        time,
                        estimate.scans_per_modulation
                    );
                    return Ok(time);
                }
                Err(error) => log::warn!(
                    "modulation time estimation failed for '{}': {}",
                    self.id,
                    error
                ),
            }
        }

        Err(ConfigurationError::MissingScalar(MODULATION_TIME.to_string()).into())
    }

    /// Resolve everything a conversion needs to size its outputs.
    pub fn resolve_meta(
        &self,
        override_rate: Option<f64>,
        override_time: Option<f64>,
        estimate_missing: bool,
        tolerance: f64,
    ) -> Result<ChromatogramMeta, DataError> {
        let scan_rate = self.scan_rate(override_rate, tolerance)?;
        let modulation_time = self.modulation_time(override_time, estimate_missing, tolerance)?;
        Ok(ChromatogramMeta {
            scan_rate,
            modulation_time,
            scans_per_modulation: scans_per_modulation(scan_rate, modulation_time)?,
            scan_count: self.scan_count()?,
            point_count: self.point_count()?,
        })
    }

    /// Read the whole scan stream and wrap it with its resolved
    /// parameters.
    pub fn load(
        &self,
        override_rate: Option<f64>,
        override_time: Option<f64>,
        estimate_missing: bool,
        tolerance: f64,
    ) -> Result<Chromatogram1D, DataError> {
        let scan_rate = self.scan_rate(override_rate, tolerance)?;
        let modulation_time = self.modulation_time(override_time, estimate_missing, tolerance)?;

        let count = self.scan_count()?;
        let mut scans = Vec::with_capacity(count);
        let mut start = 0;
        while start < count {
            let len = SCAN_CHUNK.min(count - start);
            scans.extend(self.store.scan_range(&self.id, start, len)?);
            start += len;
        }

        Ok(Chromatogram1D::new(scans, scan_rate, modulation_time))
    }

    /// Load the chromatogram and wrap it in a line cache for random access
    /// to its 2D layout.
    #[allow(clippy::too_many_arguments)]
    pub fn scanline_cache(
        &self,
        binner: MassBinner,
        average_overlaps: bool,
        fill_value: f64,
        cache_modulations: bool,
        override_rate: Option<f64>,
        override_time: Option<f64>,
        estimate_missing: bool,
        tolerance: f64,
    ) -> Result<ScanlineCache<MemoryLineStore>, DataError> {
        let chromatogram = self.load(override_rate, override_time, estimate_missing, tolerance)?;
        Ok(ScanlineCache::new(
            chromatogram,
            binner,
            average_overlaps,
            fill_value,
            cache_modulations,
        )?)
    }

    fn times_from_scans(&self, count: usize) -> Result<Vec<f64>, DataError> {
        let mut times = Vec::with_capacity(count);
        let mut start = 0;
        while start < count {
            let len = SCAN_CHUNK.min(count - start);
            for scan in self.store.scan_range(&self.id, start, len)? {
                times.push(scan.acquisition_time);
            }
            start += len;
        }
        Ok(times)
    }
}
