pub mod checkpoint;
pub mod predictor;
pub mod search_policy;
pub mod training_example;

pub use crate::checkpoint::*;
pub use crate::predictor::*;
pub use crate::search_policy::*;
pub use crate::training_example::*;
