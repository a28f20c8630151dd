pub mod annotate;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod doctor;
pub mod engine;
pub mod inference;
pub mod page_range;
pub mod rasterize;
pub mod report;
pub mod training;
pub mod util;
