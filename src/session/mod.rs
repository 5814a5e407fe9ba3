pub mod attributes;
pub mod cache;

pub use attributes::*;
pub use cache::*;
