//! Storage and coordination services.

pub mod asset_store;
pub mod classroom_service;
pub mod record_store;
