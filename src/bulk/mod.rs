// src/bulk/mod.rs
//! Bulk upload flows: decoded CSV rows are mapped onto backend payloads,
//! invalid rows are reported individually, and the valid remainder is sent
//! as one batch.

pub mod kind;
pub mod plan;
pub mod runner;
pub mod schemas;

pub use kind::BulkKind;
pub use plan::{plan_rows, BulkPlan};
pub use runner::{dry_run, run_kind, BulkSummary, DryRun};
pub use schemas::{
    BulkRow, InsuranceMapping, NewApiClient, NewDriverProfile, NewVehicleGroup, RowContext,
    VehicleGroupUpdate,
};
