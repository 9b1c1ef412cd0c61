#![deny(unused)]
//! Traffic Ops API server.
//!
//! Handlers are written against narrow typed signatures and registered in a
//! [`DispatchTable`]; the axum glue in [`server`] mounts every table path,
//! enforces sessions, answers CORS preflights and wraps results in the
//! standard response envelope.

pub mod auth;
pub mod dispatch;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod tracing_layer;

pub use auth::SessionTokens;
pub use dispatch::{DispatchTable, DispatchTableBuilder, Handler, HandlerShape, PathParams, RequestContext};
pub use metrics::setup_metrics_recorder;
pub use routes::default_table;
pub use server::{ApiServer, AppState};
pub use tracing_layer::configure_tracing;
