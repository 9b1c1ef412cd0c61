//! Core traits for Traffic Ops.

pub mod datastore;

pub use datastore::*;
