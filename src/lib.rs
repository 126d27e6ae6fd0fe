pub mod acquisition;
pub mod cloud;
pub mod config;
pub mod contact;
pub mod error;
pub mod force;
pub mod grid;
pub mod mixture;
pub mod pipeline;
pub mod segmentation;
pub mod synthetic;

pub use error::{ReconError, ReconResult};
