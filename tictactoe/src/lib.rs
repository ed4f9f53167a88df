pub mod engine;
pub mod model;

pub use crate::engine::*;
pub use crate::model::*;
