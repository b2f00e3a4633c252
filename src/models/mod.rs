//! Core data models for the frame inbox.
//!
//! `FileRecord` maps to the `file_records` table via `sqlx::FromRow` and
//! serializes as JSON for query responses.

pub mod file_record;
pub mod partition;
