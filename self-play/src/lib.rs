pub mod episode;
pub mod options;

pub use episode::*;
pub use options::*;
