//! Application services and domain types.

pub mod auth;
pub mod error;
pub mod model;
pub mod realtime;
pub mod services;
pub mod traits;
pub mod widget;
