pub mod options;
pub mod self_learn;

pub use options::*;
pub use self_learn::*;
