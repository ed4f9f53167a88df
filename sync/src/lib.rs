pub mod collective;

pub use collective::*;
