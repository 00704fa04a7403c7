pub mod flatten;
pub mod result_set;

pub use flatten::{flatten, Flattener, DEFAULT_SEPARATOR};
pub use result_set::{FlatRecord, ResultSet, SOURCE_FILE_KEY};

/// Nested document returned by the extraction function for one file.
///
/// Keys keep the order in which they appeared in the JSON text.
pub type Document = serde_json::Map<String, serde_json::Value>;
