pub mod collate;
pub mod dataset;
pub mod loader;
