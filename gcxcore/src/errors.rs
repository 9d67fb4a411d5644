use thiserror::Error;

/// Fatal acquisition-parameter errors. A chromatogram that trips one of
/// these cannot be processed with the supplied or inferred configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("modulation time must be positive, got {0}")]
    NonPositiveModulationTime(f64),

    #[error("scan rate must be positive, got {0}")]
    NonPositiveScanRate(f64),

    #[error("scan rate {scan_rate} and modulation time {modulation_time} yield zero scans per modulation")]
    EmptyModulation { scan_rate: f64, modulation_time: f64 },

    #[error("acquisition intervals too irregular to infer a scan rate: sd {sd} exceeds tolerance {tolerance}")]
    IrregularScanIntervals { sd: f64, tolerance: f64 },

    #[error("need at least two acquisition timestamps to infer a scan rate, got {0}")]
    TooFewTimestamps(usize),

    #[error("missing required scalar '{0}'")]
    MissingScalar(String),

    #[error("invalid mass range [{min_mass}, {max_mass}]")]
    InvalidMassRange { min_mass: f64, max_mass: f64 },

    #[error("mass bin resolution must be positive, got {0}")]
    NonPositiveResolution(f64),
}

/// Fatal layout-invariant violations. Offsets, bins and orderings are sized
/// and checked up front; a violation aborts the affected chromatogram
/// instead of clamping or truncating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("mass bin {bin} outside valid range [0, {nbins})")]
    BinOutOfRange { bin: i64, nbins: usize },

    #[error("write of {len} values at offset {offset} exceeds declared capacity {capacity} of '{name}'")]
    OffsetOutOfBounds {
        name: String,
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("acquisition time decreases at scan {index}: {previous} -> {current}")]
    UnsortedAcquisitionTimes {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("modulation line {index} outside valid range [0, {count})")]
    LineOutOfRange { index: usize, count: usize },

    #[error("mass and intensity arrays differ in length: {masses} vs {intensities}")]
    LengthMismatch { masses: usize, intensities: usize },
}

/// Advisory failures of the modulation-period heuristic. Callers log these
/// and fall back to configured values, they are never load-bearing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("total ion current too short for autocorrelation: {0} scans")]
    SignalTooShort(usize),

    #[error("no autocorrelation maxima above threshold {0}")]
    NoPeaks(f64),

    #[error("autocorrelation maxima spacing unstable, no dominant period")]
    UnstableSpacing,
}

/// Failures of a scanline line store while spilling or reloading
/// materialized modulation lines.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("line store i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("line store encode: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("line store decode: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

#[derive(Error, Debug)]
pub enum GcxError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Estimation(#[from] EstimationError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
