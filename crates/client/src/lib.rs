#![deny(unused)]
//! Client for the Traffic Ops API.
//!
//! [`Session`] owns the HTTP connection and cookie jar. It logs in again
//! once when a request is rejected as unauthorized, keeps an optional
//! in-memory response cache for reads with a TTL, and reports the remote
//! address of every request through [`ReqInf`].

pub mod cache;
mod endpoints;
pub mod error;
pub mod session;

pub use cache::{CacheEntry, Clock, ManualClock, ResponseCache, SystemClock};
pub use error::{ClientResult, RequestError};
pub use session::{Session, SessionOptions, DEFAULT_TIMEOUT};
pub use tokio_util::sync::CancellationToken;
pub use traffic_ops_core::types::{CacheHitStatus, ReqInf};
