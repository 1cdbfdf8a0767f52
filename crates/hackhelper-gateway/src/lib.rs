//! hackhelper-gateway - REST API over the evaluation and idea engines
//!
//! Exposes `/health` plus the `/api` routes used by the web frontend.
//! Every `/api` route sits behind an optional shared bearer token.

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
