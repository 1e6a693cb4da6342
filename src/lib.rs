//! RideWithMeru backend: accounts, server-side sessions, and transaction
//! records, backed by Redis.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
