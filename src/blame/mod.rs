pub mod types;
pub mod segments;
pub mod replay;
pub mod query;

pub use types::*;
pub use segments::{replay, Direction};
pub use query::BlameQuery;
