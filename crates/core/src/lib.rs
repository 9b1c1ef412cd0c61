#![deny(unused)]
//! Core types, traits, and error definitions for Traffic Ops.
//!
//! This crate provides the foundational building blocks shared by the API
//! server, the storage backends and the client.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, HttpError, Result};
pub use traits::*;
pub use types::*;
