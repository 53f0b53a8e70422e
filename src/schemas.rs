use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    NewProperty, NewTenant, OwnerConfig, PropertyPatch, PropertyStatus, TenantPatch, TenantStatus,
};
use crate::repository::ListPage;
use crate::services::rent_invoices::InvoiceMode;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

fn default_tenant_status() -> TenantStatus {
    TenantStatus::Pending
}
fn default_property_status() -> PropertyStatus {
    PropertyStatus::Vacant
}
fn default_limit_100() -> i64 {
    100
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_lease_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::UnprocessableEntity(
            "lease_end must not be before lease_start.".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateTenantInput {
    #[validate(length(min = 1))]
    pub property_id: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub lease_start: Option<NaiveDate>,
    pub lease_end: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub monthly_rent: f64,
    #[serde(default = "default_tenant_status")]
    pub status: TenantStatus,
}

impl CreateTenantInput {
    pub fn into_new_tenant(self) -> Result<NewTenant, AppError> {
        check_lease_order(self.lease_start, self.lease_end)?;
        Ok(NewTenant {
            property_id: self.property_id,
            full_name: self.full_name.trim().to_string(),
            email: self.email,
            lease_start: self.lease_start,
            lease_end: self.lease_end,
            monthly_rent: self.monthly_rent,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTenantInput {
    #[validate(length(min = 1))]
    pub property_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub lease_start: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub lease_end: Option<Option<NaiveDate>>,
    #[validate(range(min = 0.0))]
    pub monthly_rent: Option<f64>,
    pub status: Option<TenantStatus>,
}

impl UpdateTenantInput {
    pub fn into_patch(self) -> TenantPatch {
        TenantPatch {
            property_id: self.property_id,
            full_name: self.full_name.map(|name| name.trim().to_string()),
            email: self.email,
            lease_start: self.lease_start,
            lease_end: self.lease_end,
            monthly_rent: self.monthly_rent,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct OwnerConfigInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub monthly_rent_amount: f64,
    pub rent_start_date: Option<NaiveDate>,
}

impl From<OwnerConfigInput> for OwnerConfig {
    fn from(input: OwnerConfigInput) -> Self {
        Self {
            name: input.name.trim().to_string(),
            monthly_rent_amount: input.monthly_rent_amount,
            rent_start_date: input.rent_start_date,
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreatePropertyInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub address: Option<String>,
    #[serde(default = "default_property_status")]
    pub status: PropertyStatus,
    #[validate(nested)]
    pub owner: Option<OwnerConfigInput>,
}

impl From<CreatePropertyInput> for NewProperty {
    fn from(input: CreatePropertyInput) -> Self {
        Self {
            name: input.name.trim().to_string(),
            address: input.address,
            status: input.status,
            owner: input.owner.map(OwnerConfig::from),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePropertyInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub status: Option<PropertyStatus>,
    #[validate(nested)]
    pub owner: Option<OwnerConfigInput>,
}

impl From<UpdatePropertyInput> for PropertyPatch {
    fn from(input: UpdatePropertyInput) -> Self {
        Self {
            name: input.name.map(|name| name.trim().to_string()),
            address: input.address,
            status: input.status,
            owner: input.owner.map(OwnerConfig::from),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct GenerateInvoicesInput {
    pub mode: InvoiceMode,
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub struct GeneratePayoutsInput {
    #[serde(default)]
    pub start_month: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct ListQuery {
    #[serde(default = "default_limit_100")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl ListQuery {
    pub fn page(&self) -> ListPage {
        ListPage {
            limit: clamp_limit(self.limit),
            offset: self.offset.max(0),
        }
    }
}

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 500)
}

pub fn serialize_to_map<T>(value: &T) -> serde_json::Map<String, serde_json::Value>
where
    T: serde::Serialize,
{
    let json = serde_json::to_value(value)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
    json.as_object().cloned().unwrap_or_default()
}

pub fn remove_nulls(
    mut map: serde_json::Map<String, serde_json::Value>,
) -> serde_json::Map<String, serde_json::Value> {
    map.retain(|_, value| !value.is_null());
    map
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct TenantPath {
    pub tenant_id: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct PropertyPath {
    pub property_id: String,
}
