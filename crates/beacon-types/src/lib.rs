//! Shared domain model and HTTP payloads for the Beacon services.

pub mod api;
pub mod models;
