// src/lib.rs
pub mod errors;

pub mod data {
    pub mod dataset;
    pub mod meta;
    pub mod sink;
    pub mod spill;
    pub mod store;
}

pub mod convert {
    pub mod batch;
    pub mod order;
    pub mod pipeline;
}

pub mod sim {
    pub mod containers;
    pub mod handle;
}
