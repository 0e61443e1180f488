pub mod filter;
pub mod parser;
pub mod schema;
pub mod tag;
pub mod types;

pub use filter::FileTypeFilter;
pub use parser::{manifest_to_yaml, parse_manifest, parse_manifest_file, parse_manifest_str, parse_manifest_with_tag};
pub use types::*;
