// errors module
pub mod errors;

// algorithm module
pub mod algorithm {
    pub mod binning;
    pub mod modulation;
    pub mod period;
    pub mod statistics;
    pub mod utility;
}

// data module
pub mod data {
    pub mod spectrum;
}

// gcxgc module
pub mod gcxgc {
    pub mod chromatogram;
    pub mod line;
    pub mod scanline;
    pub mod timing;
}
