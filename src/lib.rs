//! Site chat API: chat persistence with realtime fan-out, newsletter signup and
//! the admin dashboard backend.

pub mod api;
pub mod app;
pub mod config;
pub mod core;
pub mod infrastructure;
