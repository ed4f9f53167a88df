pub mod history;
pub mod iteration_batch;
pub mod persistance;

pub use history::*;
pub use iteration_batch::*;
pub use persistance::*;
