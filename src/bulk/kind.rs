// src/bulk/kind.rs
use clap::ValueEnum;
use reqwest::Method;
use serde::Serialize;

use crate::api::BulkActionResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkKind {
    ApiClientsCreate,
    DriverProfilesCreate,
    InsuranceMappingsAssign,
    InsuranceMappingsRemove,
    VehicleGroupsCreate,
    VehicleGroupsUpdate,
}

impl BulkKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            BulkKind::ApiClientsCreate => "/api/admin/api_clients/batch_create",
            BulkKind::DriverProfilesCreate => "/api/driver_profiles/batch_create",
            BulkKind::InsuranceMappingsAssign => "/api/admin/insurance_partner_mappings/batch_assign",
            BulkKind::InsuranceMappingsRemove => "/api/admin/insurance_partner_mappings/batch_remove",
            BulkKind::VehicleGroupsCreate => "/api/fleet/vehicle_groups/batch_create",
            BulkKind::VehicleGroupsUpdate => "/api/fleet/vehicle_groups/batch_update",
        }
    }

    pub fn method(self) -> Method {
        match self {
            BulkKind::InsuranceMappingsRemove => Method::DELETE,
            BulkKind::VehicleGroupsUpdate => Method::PUT,
            _ => Method::POST,
        }
    }

    /// First sentence of the result line shown after a batch completes.
    pub fn headline(self, result: &BulkActionResponse, submitted: usize) -> String {
        match self {
            BulkKind::ApiClientsCreate => {
                format!("Created {}/{} API clients.", result.created, submitted)
            }
            BulkKind::DriverProfilesCreate => format!(
                "Processed {}/{} profiles (created {}, updated {}).",
                result.created + result.updated,
                submitted,
                result.created,
                result.updated
            ),
            BulkKind::InsuranceMappingsAssign => {
                format!("Assigned {}/{} drivers.", result.created, submitted)
            }
            BulkKind::InsuranceMappingsRemove => {
                format!("Removed {}/{} drivers.", result.removed, submitted)
            }
            BulkKind::VehicleGroupsCreate => {
                format!("Created {}/{} vehicle groups.", result.created, submitted)
            }
            BulkKind::VehicleGroupsUpdate => {
                format!("Updated {}/{} vehicle groups.", result.updated, submitted)
            }
        }
    }
}
