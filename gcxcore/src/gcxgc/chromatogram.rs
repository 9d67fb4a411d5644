use std::fmt;
use std::fmt::{Display, Formatter};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::algorithm::binning::MassBinner;
use crate::algorithm::modulation::scans_per_modulation;
use crate::data::spectrum::{Scan, SparseSpectrum};
use crate::errors::{ConfigurationError, GcxError, LayoutError};
use crate::gcxgc::line::ModulationLine;

/// A complete detector stream of one chromatogram together with the
/// acquisition parameters that shape it into two dimensions.
#[derive(Clone, Debug)]
pub struct Chromatogram1D {
    pub scans: Vec<Scan>,
    pub scan_rate: f64,
    pub modulation_time: f64,
}

impl Chromatogram1D {
    pub fn new(scans: Vec<Scan>, scan_rate: f64, modulation_time: f64) -> Self {
        Chromatogram1D {
            scans,
            scan_rate,
            modulation_time,
        }
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn scans_per_modulation(&self) -> Result<usize, ConfigurationError> {
        scans_per_modulation(self.scan_rate, self.modulation_time)
    }

    /// Number of modulation lines, the trailing partial line included.
    pub fn line_count(&self) -> Result<usize, ConfigurationError> {
        let spm = self.scans_per_modulation()?;
        Ok(self.scans.len().div_ceil(spm))
    }

    pub fn acquisition_times(&self) -> Vec<f64> {
        self.scans.iter().map(|scan| scan.acquisition_time).collect()
    }

    /// Total ion current per scan.
    pub fn tic(&self) -> Vec<f64> {
        self.scans.iter().map(|scan| scan.tic()).collect()
    }

    /// Verify that acquisition times never decrease over the stream.
    pub fn check_sorted(&self) -> Result<(), LayoutError> {
        for (index, window) in self.scans.windows(2).enumerate() {
            if window[1].acquisition_time < window[0].acquisition_time {
                return Err(LayoutError::UnsortedAcquisitionTimes {
                    index: index + 1,
                    previous: window[0].acquisition_time,
                    current: window[1].acquisition_time,
                });
            }
        }
        Ok(())
    }

    /// Extract one modulation line. The final line may be shorter than a
    /// full modulation, indices past the last line are an error.
    pub fn modulation_line(&self, index: usize) -> Result<ModulationLine, GcxError> {
        let spm = self.scans_per_modulation()?;
        let count = self.scans.len().div_ceil(spm);
        if index >= count {
            return Err(LayoutError::LineOutOfRange { index, count }.into());
        }
        let start = index * spm;
        let end = (start + spm).min(self.scans.len());
        let scans = self.scans[start..end].to_vec();
        let first_column_time = scans[0].acquisition_time;
        Ok(ModulationLine::new(index, first_column_time, scans))
    }

    pub fn modulation_lines(&self) -> Result<Vec<ModulationLine>, GcxError> {
        (0..self.line_count()?)
            .map(|index| self.modulation_line(index))
            .collect()
    }

    /// Bin all modulation lines to sparse spectra on a thread pool.
    ///
    /// # Arguments
    ///
    /// * `binner` - shared binner defining the bin layout.
    /// * `average_overlaps` - divide colliding bins by their hit count.
    /// * `num_threads` - size of the thread pool to run on.
    pub fn par_binned_lines(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
        num_threads: usize,
    ) -> Result<Vec<Vec<SparseSpectrum>>, GcxError> {
        let lines = self.modulation_lines()?;
        let pool = ThreadPoolBuilder::new().num_threads(num_threads).build().unwrap();
        pool.install(|| {
            lines
                .par_iter()
                .map(|line| line.to_sparse(binner, average_overlaps).map_err(GcxError::from))
                .collect()
        })
    }
}

impl Display for Chromatogram1D {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chromatogram1D(scans: {}, scan rate: {}, modulation time: {})",
            self.scans.len(),
            self.scan_rate,
            self.modulation_time
        )
    }
}
