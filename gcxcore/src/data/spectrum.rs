use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul};
use std::sync::Arc;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::algorithm::binning::{create_dense_array, MassBinner};
use crate::errors::LayoutError;

/// Conversion of raw mass/intensity pairs into binned representations, one
/// shared entry point for everything that can be rasterized.
pub trait Binnable {
    fn to_dense(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
        fill_value: f64,
    ) -> Result<DenseSpectrum, LayoutError>;

    fn to_sparse(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
    ) -> Result<SparseSpectrum, LayoutError>;
}

/// Represents a single mass spectrum.
///
/// This struct holds the mass values and intensities of one scan. Vectors
/// are reference counted so scans can be handed around and filtered without
/// copying the underlying data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MassSpectrum {
    pub mass: Arc<Vec<f64>>,
    pub intensity: Arc<Vec<f64>>,
}

impl MassSpectrum {
    /// Constructs a new `MassSpectrum`.
    ///
    /// # Arguments
    ///
    /// * `mass` - mass values, ascending.
    /// * `intensity` - matching intensity values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gcxcore::data::spectrum::MassSpectrum;
    /// let spectrum = MassSpectrum::new(vec![100.5, 101.5], vec![50.0, 60.0]);
    /// assert_eq!(spectrum.len(), 2);
    /// assert_eq!(spectrum.tic(), 110.0);
    /// ```
    pub fn new(mass: Vec<f64>, intensity: Vec<f64>) -> Self {
        MassSpectrum {
            mass: Arc::new(mass),
            intensity: Arc::new(intensity),
        }
    }

    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    /// Total ion current, the sum over all intensities of the scan.
    pub fn tic(&self) -> f64 {
        self.intensity.iter().sum()
    }

    /// Smallest and largest mass of the spectrum, `None` when empty.
    pub fn mass_range(&self) -> Option<(f64, f64)> {
        match (self.mass.first(), self.mass.last()) {
            (Some(&first), Some(&last)) => Some((first, last)),
            _ => None,
        }
    }

    /// Mass and intensity of the most intense data point.
    pub fn base_peak(&self) -> Option<(f64, f64)> {
        self.intensity
            .iter()
            .position_max_by_key(|&&intensity| OrderedFloat(intensity))
            .map(|index| (self.mass[index], self.intensity[index]))
    }

    /// Filters the spectrum based on a mass and an intensity window.
    ///
    /// # Arguments
    ///
    /// * `mass_min` - minimum mass to keep.
    /// * `mass_max` - maximum mass to keep.
    /// * `intensity_min` - minimum intensity to keep.
    /// * `intensity_max` - maximum intensity to keep.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gcxcore::data::spectrum::MassSpectrum;
    /// let spectrum = MassSpectrum::new(vec![100.5, 101.5, 103.5], vec![50.0, 60.0, 70.0]);
    /// let filtered = spectrum.filter_ranged(101.0, 104.0, 55.0, 75.0);
    /// assert_eq!(filtered.len(), 2);
    /// ```
    pub fn filter_ranged(
        &self,
        mass_min: f64,
        mass_max: f64,
        intensity_min: f64,
        intensity_max: f64,
    ) -> Self {
        let mut mass_vec: Vec<f64> = Vec::new();
        let mut intensity_vec: Vec<f64> = Vec::new();

        for (&mass, &intensity) in self.mass.iter().zip(self.intensity.iter()) {
            if mass_min <= mass
                && mass <= mass_max
                && intensity_min <= intensity
                && intensity <= intensity_max
            {
                mass_vec.push(mass);
                intensity_vec.push(intensity);
            }
        }

        MassSpectrum::new(mass_vec, intensity_vec)
    }
}

impl Binnable for MassSpectrum {
    fn to_dense(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
        fill_value: f64,
    ) -> Result<DenseSpectrum, LayoutError> {
        let (mass, intensity) =
            create_dense_array(&self.mass, &self.intensity, binner, average_overlaps, fill_value)?;
        Ok(DenseSpectrum { mass, intensity })
    }

    fn to_sparse(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
    ) -> Result<SparseSpectrum, LayoutError> {
        SparseSpectrum::from_points(&self.mass, &self.intensity, binner, average_overlaps)
    }
}

impl Display for MassSpectrum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.base_peak() {
            Some((mass, intensity)) => write!(
                f,
                "MassSpectrum(data points: {}, base peak: mass: {}, intensity: {})",
                self.len(),
                mass,
                intensity
            ),
            None => write!(f, "MassSpectrum(empty)"),
        }
    }
}

impl bincode::Encode for MassSpectrum {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&*self.mass, encoder)?;
        bincode::Encode::encode(&*self.intensity, encoder)?;
        Ok(())
    }
}

impl<Context> bincode::Decode<Context> for MassSpectrum {
    fn decode<D: bincode::de::Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        let mass: Vec<f64> = bincode::Decode::decode(decoder)?;
        let intensity: Vec<f64> = bincode::Decode::decode(decoder)?;
        Ok(MassSpectrum {
            mass: Arc::new(mass),
            intensity: Arc::new(intensity),
        })
    }
}

impl<'de, Context> bincode::BorrowDecode<'de, Context> for MassSpectrum {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        bincode::Decode::decode(decoder)
    }
}

/// One scan of the detector stream, the spectrum plus its position and
/// acquisition time within the run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scan {
    pub index: usize,
    pub acquisition_time: f64,
    pub spectrum: MassSpectrum,
}

impl Scan {
    pub fn new(index: usize, acquisition_time: f64, spectrum: MassSpectrum) -> Self {
        Scan {
            index,
            acquisition_time,
            spectrum,
        }
    }

    pub fn tic(&self) -> f64 {
        self.spectrum.tic()
    }
}

impl Binnable for Scan {
    fn to_dense(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
        fill_value: f64,
    ) -> Result<DenseSpectrum, LayoutError> {
        self.spectrum.to_dense(binner, average_overlaps, fill_value)
    }

    fn to_sparse(
        &self,
        binner: &MassBinner,
        average_overlaps: bool,
    ) -> Result<SparseSpectrum, LayoutError> {
        self.spectrum.to_sparse(binner, average_overlaps)
    }
}

/// A fully rasterized spectrum, one intensity per mass bin of the shared
/// binner layout. Index `i` holds the intensity of bin `i`, `mass[i]` its
/// nominal mass label.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DenseSpectrum {
    pub mass: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl DenseSpectrum {
    pub fn new(mass: Vec<f64>, intensity: Vec<f64>) -> Self {
        DenseSpectrum { mass, intensity }
    }

    pub fn len(&self) -> usize {
        self.intensity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intensity.is_empty()
    }

    pub fn tic(&self) -> f64 {
        self.intensity.iter().sum()
    }

    /// Intensity of bin `index`, zero for indices outside the layout.
    pub fn value(&self, index: i64) -> f64 {
        if index < 0 || index as usize >= self.intensity.len() {
            return 0.0;
        }
        self.intensity[index as usize]
    }

    pub fn to_sparse(&self, fill_value: f64) -> SparseSpectrum {
        SparseSpectrum::from_dense(self, fill_value)
    }
}

impl Add for DenseSpectrum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        assert_eq!(self.len(), other.len());
        let intensity = self
            .intensity
            .iter()
            .zip(other.intensity.iter())
            .map(|(a, b)| a + b)
            .collect();
        DenseSpectrum {
            mass: self.mass,
            intensity,
        }
    }
}

impl Mul<f64> for DenseSpectrum {
    type Output = Self;

    fn mul(self, scale: f64) -> Self {
        let intensity = self.intensity.iter().map(|value| value * scale).collect();
        DenseSpectrum {
            mass: self.mass,
            intensity,
        }
    }
}

/// A binned spectrum that stores only occupied bins. Queries for absent
/// bins read as zero, iteration and export run in ascending bin order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, bincode::Encode, bincode::Decode)]
pub struct SparseSpectrum {
    bins: BTreeMap<i64, f64>,
}

impl SparseSpectrum {
    pub fn new() -> Self {
        SparseSpectrum {
            bins: BTreeMap::new(),
        }
    }

    /// Bin raw mass/intensity pairs, keeping only bins that were observed.
    /// Collisions accumulate, or average when `average_overlaps` is set.
    pub fn from_points(
        masses: &[f64],
        intensities: &[f64],
        binner: &MassBinner,
        average_overlaps: bool,
    ) -> Result<SparseSpectrum, LayoutError> {
        if masses.len() != intensities.len() {
            return Err(LayoutError::LengthMismatch {
                masses: masses.len(),
                intensities: intensities.len(),
            });
        }

        let mut bins: BTreeMap<i64, f64> = BTreeMap::new();
        let mut overlaps: BTreeMap<i64, u32> = BTreeMap::new();

        for (&mass, &intensity) in masses.iter().zip(intensities.iter()) {
            let bin = binner.check(binner.bin(mass))? as i64;
            *bins.entry(bin).or_insert(0.0) += intensity;
            *overlaps.entry(bin).or_insert(0) += 1;
        }

        if average_overlaps {
            for (bin, value) in bins.iter_mut() {
                let count = overlaps[bin];
                if count > 1 {
                    *value /= count as f64;
                }
            }
        }

        Ok(SparseSpectrum { bins })
    }

    /// Compact a dense spectrum, dropping bins that still hold `fill_value`.
    pub fn from_dense(dense: &DenseSpectrum, fill_value: f64) -> SparseSpectrum {
        let bins = dense
            .intensity
            .iter()
            .enumerate()
            .filter(|(_, &value)| value != fill_value)
            .map(|(index, &value)| (index as i64, value))
            .collect();
        SparseSpectrum { bins }
    }

    /// Intensity of `bin`, zero when the bin holds no value.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gcxcore::data::spectrum::SparseSpectrum;
    /// let spectrum = SparseSpectrum::new();
    /// assert_eq!(spectrum.get(42), 0.0);
    /// ```
    pub fn get(&self, bin: i64) -> f64 {
        self.bins.get(&bin).copied().unwrap_or(0.0)
    }

    /// Occupied bin indices, ascending.
    pub fn bin_indices(&self) -> Vec<i64> {
        self.bins.keys().copied().collect()
    }

    /// Export to parallel arrays in ascending bin order.
    pub fn to_arrays(&self) -> (Vec<i64>, Vec<f64>) {
        self.bins.iter().map(|(&bin, &value)| (bin, value)).unzip()
    }

    /// Expand to the full bin layout of `binner`, unoccupied bins take
    /// `fill_value`. Bins outside the layout are a hard error.
    pub fn to_dense(
        &self,
        binner: &MassBinner,
        fill_value: f64,
    ) -> Result<DenseSpectrum, LayoutError> {
        let mut intensity = vec![fill_value; binner.num_bins()];
        for (&bin, &value) in self.bins.iter() {
            let index = binner.check(bin)?;
            intensity[index] = value;
        }
        Ok(DenseSpectrum {
            mass: binner.bin_masses(),
            intensity,
        })
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn tic(&self) -> f64 {
        self.bins.values().sum()
    }
}

impl Add for SparseSpectrum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let mut bins = self.bins;
        for (bin, value) in other.bins {
            *bins.entry(bin).or_insert(0.0) += value;
        }
        SparseSpectrum { bins }
    }
}

impl Mul<f64> for SparseSpectrum {
    type Output = Self;

    fn mul(self, scale: f64) -> Self {
        let bins = self.bins.into_iter().map(|(bin, value)| (bin, value * scale)).collect();
        SparseSpectrum { bins }
    }
}

/// Either binned representation behind one dispatch point, so pipelines can
/// pick dense or sparse storage per scan without forking their code paths.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum BinnedSpectrum {
    Dense(DenseSpectrum),
    Sparse(SparseSpectrum),
}

impl BinnedSpectrum {
    pub fn is_sparse(&self) -> bool {
        matches!(self, BinnedSpectrum::Sparse(_))
    }

    pub fn get(&self, bin: i64) -> f64 {
        match self {
            BinnedSpectrum::Dense(dense) => dense.value(bin),
            BinnedSpectrum::Sparse(sparse) => sparse.get(bin),
        }
    }

    pub fn tic(&self) -> f64 {
        match self {
            BinnedSpectrum::Dense(dense) => dense.tic(),
            BinnedSpectrum::Sparse(sparse) => sparse.tic(),
        }
    }

    pub fn to_dense(
        &self,
        binner: &MassBinner,
        fill_value: f64,
    ) -> Result<DenseSpectrum, LayoutError> {
        match self {
            BinnedSpectrum::Dense(dense) => Ok(dense.clone()),
            BinnedSpectrum::Sparse(sparse) => sparse.to_dense(binner, fill_value),
        }
    }
}

impl Add for BinnedSpectrum {
    type Output = Self;

    // same representations stay what they are, mixed ones promote to dense
    fn add(self, other: Self) -> Self {
        match (self, other) {
            (BinnedSpectrum::Dense(a), BinnedSpectrum::Dense(b)) => BinnedSpectrum::Dense(a + b),
            (BinnedSpectrum::Sparse(a), BinnedSpectrum::Sparse(b)) => BinnedSpectrum::Sparse(a + b),
            (BinnedSpectrum::Dense(mut dense), BinnedSpectrum::Sparse(sparse))
            | (BinnedSpectrum::Sparse(sparse), BinnedSpectrum::Dense(mut dense)) => {
                for (bin, value) in sparse.bins {
                    dense.intensity[bin as usize] += value;
                }
                BinnedSpectrum::Dense(dense)
            }
        }
    }
}

impl Mul<f64> for BinnedSpectrum {
    type Output = Self;

    fn mul(self, scale: f64) -> Self {
        match self {
            BinnedSpectrum::Dense(dense) => BinnedSpectrum::Dense(dense * scale),
            BinnedSpectrum::Sparse(sparse) => BinnedSpectrum::Sparse(sparse * scale),
        }
    }
}
