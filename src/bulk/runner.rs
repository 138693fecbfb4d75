// src/bulk/runner.rs
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::kind::BulkKind;
use super::plan::{plan_rows, BulkPlan};
use super::schemas::{
    BulkRow, InsuranceMapping, NewApiClient, NewDriverProfile, NewVehicleGroup, RowContext,
    VehicleGroupUpdate,
};
use crate::api::{BatchApi, BulkActionResponse};
use crate::csv::parse_csv_records;
use crate::error::{ApiError, BulkError};

/// How many diagnostics the one-line error banner shows.
pub const SHOWN_ERRORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub kind: BulkKind,
    pub submitted: usize,
    pub response: BulkActionResponse,
    /// Local row diagnostics followed by server-reported errors.
    pub errors: Vec<String>,
}

impl BulkSummary {
    pub fn message(&self) -> String {
        let mut msg = self.kind.headline(&self.response, self.submitted);
        if self.response.skipped > 0 {
            msg.push_str(&format!(" Skipped: {}", self.response.skipped));
        }
        if !self.errors.is_empty() {
            msg.push_str(&format!(" Errors: {}", self.errors.len()));
        }
        msg
    }

    pub fn error_banner(&self) -> Option<String> {
        error_banner(&self.errors)
    }
}

pub(crate) fn error_banner(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .take(SHOWN_ERRORS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
    )
}

/// Planned payload of a flow that was not submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DryRun {
    pub kind: BulkKind,
    pub payload: Value,
    pub errors: Vec<String>,
}

impl DryRun {
    pub fn valid_rows(&self) -> usize {
        self.payload.as_array().map_or(0, Vec::len)
    }
}

fn plan_text<T: BulkRow>(text: &str, ctx: &RowContext) -> BulkPlan<T> {
    plan_rows(&parse_csv_records(text).rows, ctx)
}

fn dry_schema<T: BulkRow>(kind: BulkKind, text: &str, ctx: &RowContext) -> Result<DryRun, BulkError> {
    let BulkPlan { payload, errors } = plan_text::<T>(text, ctx);
    let payload = serde_json::to_value(&payload).map_err(ApiError::from)?;
    Ok(DryRun {
        kind,
        payload,
        errors,
    })
}

async fn run_schema<T: BulkRow, A: BatchApi>(
    api: &A,
    kind: BulkKind,
    text: &str,
    ctx: &RowContext,
) -> Result<BulkSummary, BulkError> {
    let BulkPlan { payload, errors } = plan_text::<T>(text, ctx).require_rows()?;
    let submitted = payload.len();
    let payload = serde_json::to_value(&payload).map_err(ApiError::from)?;
    submit(api, kind, submitted, payload, errors).await
}

/// Decodes and validates without touching the network.
pub fn dry_run(kind: BulkKind, text: &str, ctx: &RowContext) -> Result<DryRun, BulkError> {
    match kind {
        BulkKind::ApiClientsCreate => dry_schema::<NewApiClient>(kind, text, ctx),
        BulkKind::DriverProfilesCreate => dry_schema::<NewDriverProfile>(kind, text, ctx),
        BulkKind::InsuranceMappingsAssign | BulkKind::InsuranceMappingsRemove => {
            dry_schema::<InsuranceMapping>(kind, text, ctx)
        }
        BulkKind::VehicleGroupsCreate => dry_schema::<NewVehicleGroup>(kind, text, ctx),
        BulkKind::VehicleGroupsUpdate => dry_schema::<VehicleGroupUpdate>(kind, text, ctx),
    }
}

/// Runs the flow for `kind` with the row schema that kind expects.
pub async fn run_kind<A: BatchApi>(
    api: &A,
    kind: BulkKind,
    text: &str,
    ctx: &RowContext,
) -> Result<BulkSummary, BulkError> {
    match kind {
        BulkKind::ApiClientsCreate => run_schema::<NewApiClient, A>(api, kind, text, ctx).await,
        BulkKind::DriverProfilesCreate => {
            run_schema::<NewDriverProfile, A>(api, kind, text, ctx).await
        }
        BulkKind::InsuranceMappingsAssign | BulkKind::InsuranceMappingsRemove => {
            run_schema::<InsuranceMapping, A>(api, kind, text, ctx).await
        }
        BulkKind::VehicleGroupsCreate => run_schema::<NewVehicleGroup, A>(api, kind, text, ctx).await,
        BulkKind::VehicleGroupsUpdate => {
            run_schema::<VehicleGroupUpdate, A>(api, kind, text, ctx).await
        }
    }
}

#[instrument(level = "info", skip(api, payload, errors), fields(endpoint = kind.endpoint()))]
async fn submit<A: BatchApi>(
    api: &A,
    kind: BulkKind,
    submitted: usize,
    payload: Value,
    errors: Vec<String>,
) -> Result<BulkSummary, BulkError> {
    info!(rows = submitted, rejected = errors.len(), "submitting batch");
    let response = api.submit_batch(kind, &payload).await?;

    let mut combined = errors;
    combined.extend(response.errors.iter().cloned());
    let summary = BulkSummary {
        kind,
        submitted,
        response,
        errors: combined,
    };
    info!(summary = %summary.message(), "batch finished");
    Ok(summary)
}
