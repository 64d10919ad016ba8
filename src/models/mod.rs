//! Core data models for the classroom backend.
//!
//! Both entities are persisted as JSON arrays by the record store and
//! serialize with the camelCase field names the stored files already use.

pub mod lecture;
pub mod student;
