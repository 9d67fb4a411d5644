use crate::algorithm::binning::MassBinner;
use crate::data::spectrum::{Binnable, DenseSpectrum, Scan, SparseSpectrum};
use crate::errors::LayoutError;

/// One modulation worth of scans, a single line of the 2D chromatogram.
/// The line index counts modulations from the start of the run, the last
/// line of a run may hold fewer scans than a full modulation.
#[derive(Clone, Debug)]
pub struct ModulationLine {
    pub index: usize,
    pub first_column_time: f64,
    pub scans: Vec<Scan>,
}

impl ModulationLine {
    pub fn new(index: usize, first_column_time: f64, scans: Vec<Scan>) -> Self {
        ModulationLine {
            index,
            first_column_time,
            scans,
        }
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Total ion current of each scan along the line.
    pub fn tic(&self) -> Vec<f64> {
        self.scans.iter().map(|scan| scan.tic()).collect()
    }

    /// Second-column retention time of each scan, elapsed since the line
    /// opened.
    pub fn second_column_times(&self) -> Vec<f64> {
        self.scans
            .iter()
            .map(|scan| scan.acquisition_time - self.first_column_time)
            .collect()
    }

    pub fn to_dense(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
        fill_value: f64,
    ) -> Result<Vec<DenseSpectrum>, LayoutError> {
        self.scans
            .iter()
            .map(|scan| scan.to_dense(binner, average_overlaps, fill_value))
            .collect()
    }

    pub fn to_sparse(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
    ) -> Result<Vec<SparseSpectrum>, LayoutError> {
        self.scans
            .iter()
            .map(|scan| scan.to_sparse(binner, average_overlaps))
            .collect()
    }
}
