pub mod backend;
pub mod data;
pub mod engine;
pub mod error;

pub use error::{Error, Result};
