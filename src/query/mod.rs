pub mod column;

pub use column::{resolve_columns, ColumnReference, ParsedQuery, ResolvedColumn};
