pub mod analyzer;
pub mod bars;
pub mod classifier;
pub mod indicators;
pub mod levels;


pub use analyzer::*;
pub use bars::*;
pub use classifier::*;
pub use indicators::*;
pub use levels::*;
