//! PostgreSQL storage module for play and tracking data
//!
//! Read-only: a per-request connection provider plus the fixed set of
//! statements the API serves.

pub mod connection;
pub mod repository;
pub mod schema;

#[cfg(test)]
pub mod fixture;

pub use connection::{Database, StoreError};
pub use repository::{PlayFilter, SpeedFilter, TrackingRepository};
