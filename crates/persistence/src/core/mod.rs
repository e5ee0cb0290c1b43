//! Core adapter abstractions.
//!
//! - [`Adapter`] - the create/find/update/delete contract exposed to callers
//! - [`BaseAdapter`] - engine-independent defaults composed by engine adapters

mod adapter;

pub use adapter::{Adapter, AdapterFeatures, BaseAdapter};
