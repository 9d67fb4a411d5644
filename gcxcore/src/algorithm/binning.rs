use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigurationError, LayoutError};

/// Policy used to discretize a scaled mass value to an integer bin.
///
/// `Down` truncates toward negative infinity and is the default. `Nearest`
/// rounds half-to-even. `Heiko` truncates like `Down` but rounds up once the
/// fractional part exceeds 0.7, a heuristic for centroided data whose peak
/// apexes sit high inside their nominal mass window.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundingPolicy {
    Nearest,
    Down,
    Heiko,
}

impl RoundingPolicy {
    /// Apply the policy to a scaled mass value.
    ///
    /// # Arguments
    ///
    /// * `value` - scaled mass value, the product of mass and resolution.
    ///
    /// # Returns
    ///
    /// * `i64` - the discretized value, negative values allowed.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gcxcore::algorithm::binning::RoundingPolicy;
    ///
    /// assert_eq!(RoundingPolicy::Down.apply(50.9), 50);
    /// assert_eq!(RoundingPolicy::Nearest.apply(50.5), 50);
    /// assert_eq!(RoundingPolicy::Heiko.apply(50.71), 51);
    /// ```
    pub fn apply(&self, value: f64) -> i64 {
        match self {
            RoundingPolicy::Nearest => value.round_ties_even() as i64,
            RoundingPolicy::Down => value.floor() as i64,
            RoundingPolicy::Heiko => {
                let floored = value.floor();
                if value - floored > 0.7 {
                    floored as i64 + 1
                } else {
                    floored as i64
                }
            }
        }
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        RoundingPolicy::Down
    }
}

impl Display for RoundingPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RoundingPolicy::Nearest => write!(f, "nearest"),
            RoundingPolicy::Down => write!(f, "down"),
            RoundingPolicy::Heiko => write!(f, "heiko"),
        }
    }
}

impl FromStr for RoundingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(RoundingPolicy::Nearest),
            "down" => Ok(RoundingPolicy::Down),
            "heiko" => Ok(RoundingPolicy::Heiko),
            other => Err(format!("unknown rounding policy '{}'", other)),
        }
    }
}

/// Maps continuous mass values onto integer bin indices over a fixed mass
/// range. The mapping is a pure function of the configured range, resolution
/// and rounding policy, so one binner is shared across all scans of a
/// conversion and bin indices stay comparable between chromatograms.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct MassBinner {
    pub min_mass: f64,
    pub max_mass: f64,
    pub resolution: f64,
    pub policy: RoundingPolicy,
}

impl MassBinner {
    /// Create a binner over `[min_mass, max_mass]` with `resolution` bins
    /// per mass unit.
    ///
    /// # Arguments
    ///
    /// * `min_mass` - lower edge of the mass range.
    /// * `max_mass` - upper edge of the mass range.
    /// * `resolution` - bins per mass unit, must be positive.
    /// * `policy` - rounding policy applied to scaled masses.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gcxcore::algorithm::binning::{MassBinner, RoundingPolicy};
    ///
    /// let binner = MassBinner::new(50.0, 100.0, 1.0, RoundingPolicy::Down).unwrap();
    /// assert_eq!(binner.bin(50.0), 0);
    /// assert_eq!(binner.bin(73.4), 23);
    /// assert_eq!(binner.num_bins(), 51);
    /// ```
    pub fn new(
        min_mass: f64,
        max_mass: f64,
        resolution: f64,
        policy: RoundingPolicy,
    ) -> Result<MassBinner, ConfigurationError> {
        if !(resolution > 0.0) {
            return Err(ConfigurationError::NonPositiveResolution(resolution));
        }
        if !(min_mass.is_finite() && max_mass.is_finite()) || min_mass > max_mass {
            return Err(ConfigurationError::InvalidMassRange { min_mass, max_mass });
        }
        Ok(MassBinner {
            min_mass,
            max_mass,
            resolution,
            policy,
        })
    }

    /// Map a mass to its bin index relative to the range minimum. The result
    /// can be negative or beyond the bin count for masses outside the
    /// configured range, see [`MassBinner::check`].
    pub fn bin(&self, mass: f64) -> i64 {
        self.policy.apply(mass * self.resolution) - self.policy.apply(self.min_mass * self.resolution)
    }

    /// Validate a bin index against the bin count. Out-of-range indices are
    /// an error, they are never clamped.
    pub fn check(&self, bin: i64) -> Result<usize, LayoutError> {
        let nbins = self.num_bins();
        if bin < 0 || bin as usize >= nbins {
            return Err(LayoutError::BinOutOfRange { bin, nbins });
        }
        Ok(bin as usize)
    }

    /// Number of bins spanned by the configured range, one past the last
    /// addressable integer mass so the rounded-up maximum still fits.
    pub fn num_bins(&self) -> usize {
        ((self.max_mass.ceil() - self.min_mass.floor() + 1.0) * self.resolution).ceil() as usize
    }

    /// Nominal mass at the lower edge of bin `index`.
    pub fn bin_mass(&self, index: usize) -> f64 {
        self.min_mass + index as f64 / self.resolution
    }

    /// Mass labels of all bins, ascending.
    pub fn bin_masses(&self) -> Vec<f64> {
        (0..self.num_bins()).map(|i| self.bin_mass(i)).collect()
    }
}

impl Display for MassBinner {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MassBinner(range: [{}, {}], resolution: {}, policy: {}, bins: {})",
            self.min_mass,
            self.max_mass,
            self.resolution,
            self.policy,
            self.num_bins()
        )
    }
}

/// Rasterize one scan into a dense intensity array indexed by mass bin.
///
/// Bins never observed keep `fill_value`, the first observation of a bin
/// replaces the fill outright and later observations accumulate. When
/// `average_overlaps` is set, bins hit more than once are divided by their
/// observation count at the end.
///
/// # Arguments
///
/// * `masses` - mass values of a single scan.
/// * `intensities` - matching intensity values, same length.
/// * `binner` - shared binner defining the bin layout.
/// * `average_overlaps` - divide colliding bins by their hit count.
/// * `fill_value` - value assigned to bins without any observation.
///
/// # Returns
///
/// * `(Vec<f64>, Vec<f64>)` - mass labels and binned intensities, both of
///   length [`MassBinner::num_bins`].
pub fn create_dense_array(
    masses: &[f64],
    intensities: &[f64],
    binner: &MassBinner,
    average_overlaps: bool,
    fill_value: f64,
) -> Result<(Vec<f64>, Vec<f64>), LayoutError> {
    if masses.len() != intensities.len() {
        return Err(LayoutError::LengthMismatch {
            masses: masses.len(),
            intensities: intensities.len(),
        });
    }

    let nbins = binner.num_bins();
    let mut values = vec![fill_value; nbins];
    let mut overlaps = vec![0u32; nbins];

    for (&mass, &intensity) in masses.iter().zip(intensities.iter()) {
        let bin = binner.check(binner.bin(mass))?;
        if overlaps[bin] == 0 {
            values[bin] = intensity;
        } else {
            values[bin] += intensity;
        }
        overlaps[bin] += 1;
    }

    if average_overlaps {
        for (value, &count) in values.iter_mut().zip(overlaps.iter()) {
            if count > 1 {
                *value /= count as f64;
            }
        }
    }

    Ok((binner.bin_masses(), values))
}
