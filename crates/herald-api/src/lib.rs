//! Herald API - REST surface for the dispatch engine
//!
//! This crate exposes campaign lifecycle, instant broadcast, audit log
//! and identity endpoints over HTTP.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
