//! Abstract query specifications and find results.
//!
//! Every attribute of a [`QuerySpec`] is optional and independent; an empty
//! attribute means "no constraint of that kind".

use super::record::Record;
use super::value::Value;

/// Prefix marking a match value or id as excluded instead of required.
pub const NEGATION_SENTINEL: &str = "NOT-";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// Engine keyword for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortDirective {
    /// Field to sort on.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

/// Value side of a match constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    /// The field must equal this value.
    One(Value),
    /// The field must equal any one of these values.
    Any(Vec<Value>),
}

impl From<Value> for MatchValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => MatchValue::Any(items),
            other => MatchValue::One(other),
        }
    }
}

/// Inclusive range bounds; [`Value::Null`] leaves a side unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    /// Lower bound.
    pub low: Value,
    /// Upper bound.
    pub high: Value,
}

/// A query against one record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    /// Sort keys, in priority order.
    pub sort: Vec<SortDirective>,
    /// Field projection: `true` includes, `false` excludes.
    pub fields: Vec<(String, bool)>,
    /// Field presence: `true` requires the field, `false` forbids it.
    pub exists: Vec<(String, bool)>,
    /// Equality constraints.
    pub matches: Vec<(String, MatchValue)>,
    /// Range constraints.
    pub range: Vec<(String, RangeSpec)>,
    /// Free-text query string.
    pub query: Option<String>,
    /// Page size; `Some(0)` applies the default cap.
    pub limit: Option<usize>,
    /// Number of leading matches to skip.
    pub offset: Option<usize>,
}

impl QuerySpec {
    /// Creates an unconstrained query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sort key.
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortDirective {
            field: field.into(),
            direction,
        });
        self
    }

    /// Includes (`true`) or excludes (`false`) a field from results.
    pub fn with_field(mut self, field: impl Into<String>, include: bool) -> Self {
        self.fields.push((field.into(), include));
        self
    }

    /// Requires a field to be present (`true`) or absent (`false`).
    pub fn with_exists(mut self, field: impl Into<String>, present: bool) -> Self {
        self.exists.push((field.into(), present));
        self
    }

    /// Adds an equality constraint; an array value matches any of its elements.
    pub fn with_match(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.matches.push((field.into(), MatchValue::from(value.into())));
        self
    }

    /// Adds a range constraint.
    pub fn with_range(
        mut self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.range.push((
            field.into(),
            RangeSpec {
                low: low.into(),
                high: high.into(),
            },
        ));
        self
    }

    /// Sets the free-text query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of matches to skip.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if any exists, match, range or free-text constraint is set.
    pub fn has_constraints(&self) -> bool {
        !self.exists.is_empty()
            || !self.matches.is_empty()
            || !self.range.is_empty()
            || self.query.is_some()
    }
}

/// Splits a sentinel-prefixed value into `(negated, stripped value)`.
pub fn strip_negation(value: &str) -> (bool, &str) {
    match value.strip_prefix(NEGATION_SENTINEL) {
        Some(rest) => (true, rest),
        None => (false, value),
    }
}

/// Records returned by a find, with the total match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindResult {
    /// Matching records, in result order.
    pub records: Vec<Record>,
    /// Total matches across the collection, independent of limit and offset.
    pub count: u64,
}

impl FindResult {
    /// Number of records on this page.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the page holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
