// src/lib.rs
pub mod api;
pub mod bulk;
pub mod config;
pub mod csv;
pub mod download;
pub mod error;
pub mod export;
