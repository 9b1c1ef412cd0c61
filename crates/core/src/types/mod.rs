//! Core type definitions for Traffic Ops.
//!
//! Shared by the API server and the client so both sides agree on the wire.

pub mod envelope;
pub mod method;
pub mod request_info;
pub mod resources;

pub use envelope::*;
pub use method::*;
pub use request_info::*;
pub use resources::*;
