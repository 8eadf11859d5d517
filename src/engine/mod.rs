pub mod config;
pub mod gradient;
pub mod layer;
pub mod listener;
pub mod loss;
pub mod optimizer;
