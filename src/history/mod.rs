pub mod types;
pub mod parser;

pub use types::*;
pub use parser::{parse_git_log, strip_git_log};
