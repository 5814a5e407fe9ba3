pub mod common;
pub mod objects;
pub mod types;

pub use common::*;
pub use objects::*;
pub use types::*;
