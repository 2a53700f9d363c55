//! Storage and realtime transports.

pub mod database;
pub mod entities;
pub mod error;
pub mod hub;
pub mod pusher;
pub mod repositories;
pub mod traits;
