// crates/core/src/lib.rs
pub mod error;
pub mod paths;
pub mod period;

pub use error::*;
pub use period::*;
