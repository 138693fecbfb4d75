// src/bulk/schemas.rs
use serde::Serialize;

use crate::csv::{get_row_value, CsvRow};

/// Values the caller supplies alongside the file.
#[derive(Debug, Clone, Default)]
pub struct RowContext {
    /// Used when a vehicle-group row carries no fleet id of its own.
    pub default_fleet_id: Option<String>,
}

/// One backend payload entry built from a decoded row.
pub trait BulkRow: Serialize + Sized {
    /// `Err` carries the row diagnostic without the `Row n:` prefix.
    fn from_row(row: &CsvRow, ctx: &RowContext) -> Result<Self, &'static str>;
}

/// Case-insensitive `true`, `1` or `yes`.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewApiClient {
    pub name: String,
    pub role: String,
    pub active: bool,
    #[serde(rename = "driverProfileId", skip_serializing_if = "Option::is_none")]
    pub driver_profile_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_partner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl BulkRow for NewApiClient {
    fn from_row(row: &CsvRow, _ctx: &RowContext) -> Result<Self, &'static str> {
        let name = get_row_value(row, &["name"]);
        let role = get_row_value(row, &["role"]);
        if name.is_empty() || role.is_empty() {
            return Err("missing name or role");
        }
        let active = get_row_value(row, &["active"]);
        Ok(Self {
            name,
            role,
            active: active.is_empty() || is_truthy(&active),
            driver_profile_id: non_empty(get_row_value(row, &["driverProfileId"])),
            fleet_id: non_empty(get_row_value(row, &["fleet_id", "fleetId"])),
            insurance_partner_id: non_empty(get_row_value(
                row,
                &["insurance_partner_id", "insurancePartnerId"],
            )),
            api_key: non_empty(get_row_value(row, &["api_key", "apiKey"])),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDriverProfile {
    #[serde(rename = "driverProfileId")]
    pub driver_profile_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<bool>,
}

impl BulkRow for NewDriverProfile {
    fn from_row(row: &CsvRow, _ctx: &RowContext) -> Result<Self, &'static str> {
        let driver_profile_id = get_row_value(row, &["driverProfileId"]);
        let email = get_row_value(row, &["email"]);
        if driver_profile_id.is_empty() || email.is_empty() {
            return Err("missing driverProfileId or email");
        }
        let sync = non_empty(get_row_value(row, &["sync"])).map(|v| is_truthy(&v));
        Ok(Self {
            driver_profile_id,
            email,
            sync,
        })
    }
}

/// Partner-to-driver link; the same shape assigns and removes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsuranceMapping {
    pub partner_id: String,
    #[serde(rename = "driverProfileId")]
    pub driver_profile_id: String,
}

impl BulkRow for InsuranceMapping {
    fn from_row(row: &CsvRow, _ctx: &RowContext) -> Result<Self, &'static str> {
        let partner_id = get_row_value(row, &["partner_id", "partnerId"]);
        let driver_profile_id = get_row_value(row, &["driverProfileId", "driver_profile_id"]);
        if partner_id.is_empty() || driver_profile_id.is_empty() {
            return Err("missing partner_id or driverProfileId");
        }
        Ok(Self {
            partner_id,
            driver_profile_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVehicleGroup {
    pub fleet_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BulkRow for NewVehicleGroup {
    fn from_row(row: &CsvRow, ctx: &RowContext) -> Result<Self, &'static str> {
        let fleet_id = non_empty(get_row_value(row, &["fleet_id", "fleetId"]))
            .or_else(|| ctx.default_fleet_id.clone().filter(|f| !f.is_empty()));
        let name = get_row_value(row, &["name"]);
        let fleet_id = match fleet_id {
            Some(f) if !name.is_empty() => f,
            _ => return Err("missing fleet_id or name"),
        };
        Ok(Self {
            fleet_id,
            name,
            description: non_empty(get_row_value(row, &["description"])),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleGroupUpdate {
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BulkRow for VehicleGroupUpdate {
    fn from_row(row: &CsvRow, _ctx: &RowContext) -> Result<Self, &'static str> {
        let group_id = get_row_value(row, &["group_id", "groupId", "vehicle_group_id"]);
        if group_id.is_empty() {
            return Err("missing group_id");
        }
        let name = non_empty(get_row_value(row, &["name"]));
        let description = non_empty(get_row_value(row, &["description"]));
        if name.is_none() && description.is_none() {
            return Err("no updates provided");
        }
        Ok(Self {
            group_id,
            name,
            description,
        })
    }
}
