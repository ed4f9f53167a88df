pub mod evaluate;
pub mod gate;

pub use evaluate::*;
pub use gate::*;
