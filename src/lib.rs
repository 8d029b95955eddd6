pub mod datasets;
pub mod export;
