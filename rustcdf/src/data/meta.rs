use serde::{Deserialize, Serialize};

// scalar variables of a source chromatogram
pub const SCAN_RATE: &str = "scan_rate";
pub const MODULATION_TIME: &str = "modulation_time";
pub const SCAN_DURATION: &str = "scan_duration";

// per-scan and per-point variables of a source chromatogram
pub const SCAN_ACQUISITION_TIME: &str = "scan_acquisition_time";
pub const TOTAL_INTENSITY: &str = "total_intensity";
pub const MASS_VALUES: &str = "mass_values";
pub const INTENSITY_VALUES: &str = "intensity_values";
pub const SCAN_INDEX: &str = "scan_index";

// variables produced by a conversion
pub const FIRST_COLUMN_ELUTION_TIME: &str = "first_column_elution_time";
pub const SECOND_COLUMN_ELUTION_TIME: &str = "second_column_elution_time";
pub const MEAN_INTENSITY_VALUES: &str = "mean_intensity_values";
pub const VAR_INTENSITY_VALUES: &str = "var_intensity_values";
pub const SD_INTENSITY_VALUES: &str = "sd_intensity_values";
pub const SECOND_COLUMN_SCAN_INDEX: &str = "second_column_scan_index";
pub const TOTAL_INTENSITY_1D: &str = "total_intensity_1d";
pub const TOTAL_INTENSITY_2D: &str = "total_intensity_2d";

/// Index variable describing the start offsets of a ragged variable, or
/// `None` for variables that are not ragged.
pub fn ragged_index_name(name: &str) -> Option<&'static str> {
    match name {
        MASS_VALUES | INTENSITY_VALUES => Some(SCAN_INDEX),
        TOTAL_INTENSITY_2D => Some(SECOND_COLUMN_SCAN_INDEX),
        _ => None,
    }
}

/// Resolved acquisition geometry of one chromatogram, everything a
/// conversion needs to size its outputs up front.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ChromatogramMeta {
    pub scan_rate: f64,
    pub modulation_time: f64,
    pub scans_per_modulation: usize,
    pub scan_count: usize,
    pub point_count: usize,
}
