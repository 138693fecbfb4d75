// src/api/mod.rs
//! Typed access to the fleet analytics backend.

pub mod client;

pub use client::{ApiClient, BatchApi, BulkActionResponse};
