//! Frame inbox: day-partitioned blob storage with a SQLite metadata index.
//!
//! Uploaded frames are written to the object store first and registered in
//! the index second. The two stores are kept consistent on a best-effort
//! basis: an index failure after a successful write leaves an unregistered
//! blob behind, which the reconciliation sweep can find later.

pub mod config;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
