//! Core types for the persistence layer.
//!
//! - [`Value`] - dynamic field value with its wire codec
//! - [`Record`], [`RecordTypes`] - records and the schema they follow
//! - [`QuerySpec`], [`FindResult`] - find input and output
//! - [`UpdateSpec`] - partial update input
//!
//! # Example
//!
//! ```
//! use docbridge_persistence::types::{QuerySpec, SortDirection, UpdateSpec};
//!
//! let query = QuerySpec::new()
//!     .with_match("name", "NOT-Bob")
//!     .with_range("age", 18, None::<i64>)
//!     .with_sort("age", SortDirection::Descending)
//!     .with_limit(20);
//! assert!(query.has_constraints());
//!
//! let update = UpdateSpec::new("1").push("tags", "new").replace("status", "A");
//! assert_eq!(update.array_fields().collect::<Vec<_>>(), vec!["tags"]);
//! ```

mod query;
mod record;
mod update;
mod value;

pub use query::{
    FindResult, MatchValue, NEGATION_SENTINEL, QuerySpec, RangeSpec, SortDirection,
    SortDirective, strip_negation,
};
pub use record::{FieldDescriptor, FieldType, Record, RecordSchema, RecordTypes};
pub use update::UpdateSpec;
pub use value::{BUFFER_TAG, Value};
