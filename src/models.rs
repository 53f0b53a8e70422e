//! Typed rows for the aggregates the obligation engine reads and writes.
//!
//! Tenant and Property are independent aggregates linked only by
//! `property_id`. Obligations reference both but own neither.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Pending,
    Active,
    Past,
}

impl TenantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Past => "past",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub property_id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub lease_start: Option<NaiveDate>,
    #[serde(default)]
    pub lease_end: Option<NaiveDate>,
    pub monthly_rent: f64,
    pub status: TenantStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTenant {
    pub property_id: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_end: Option<NaiveDate>,
    pub monthly_rent: f64,
    pub status: TenantStatus,
}

/// Partial update. `lease_end` uses a nested option so callers can clear it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantPatch {
    pub property_id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub lease_start: Option<NaiveDate>,
    pub lease_end: Option<Option<NaiveDate>>,
    pub monthly_rent: Option<f64>,
    pub status: Option<TenantStatus>,
}

impl TenantPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, tenant: &mut Tenant) {
        if let Some(property_id) = &self.property_id {
            tenant.property_id = property_id.clone();
        }
        if let Some(full_name) = &self.full_name {
            tenant.full_name = full_name.clone();
        }
        if let Some(email) = &self.email {
            tenant.email = Some(email.clone());
        }
        if let Some(lease_start) = self.lease_start {
            tenant.lease_start = Some(lease_start);
        }
        if let Some(lease_end) = self.lease_end {
            tenant.lease_end = lease_end;
        }
        if let Some(monthly_rent) = self.monthly_rent {
            tenant.monthly_rent = monthly_rent;
        }
        if let Some(status) = self.status {
            tenant.status = status;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Vacant,
    Occupied,
    UnderMaintenance,
}

impl PropertyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vacant => "vacant",
            Self::Occupied => "occupied",
            Self::UnderMaintenance => "under_maintenance",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub monthly_rent_amount: f64,
    #[serde(default)]
    pub rent_start_date: Option<NaiveDate>,
}

impl OwnerConfig {
    /// Payouts are only generated for owners with a name and a positive amount.
    pub fn is_payable(&self) -> bool {
        !self.name.trim().is_empty() && self.monthly_rent_amount > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub status: PropertyStatus,
    #[serde(default)]
    pub owner: Option<OwnerConfig>,
}

impl Property {
    pub fn payable_owner(&self) -> Option<&OwnerConfig> {
        self.owner.as_ref().filter(|owner| owner.is_payable())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub status: PropertyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerConfig>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub status: Option<PropertyStatus>,
    pub owner: Option<OwnerConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Partial,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentInvoice {
    pub id: String,
    pub tenant_id: String,
    pub property_id: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRentInvoice {
    pub tenant_id: String,
    pub property_id: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerPayout {
    pub id: String,
    pub property_id: String,
    pub amount: f64,
    pub payment_month: NaiveDate,
    pub status: PayoutStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOwnerPayout {
    pub property_id: String,
    pub amount: f64,
    pub payment_month: NaiveDate,
    pub status: PayoutStatus,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{OwnerConfig, Property, PropertyStatus, Tenant, TenantPatch, TenantStatus};

    #[test]
    fn decodes_property_row_with_embedded_owner() {
        let row = json!({
            "id": "p-1",
            "name": "Edificio Sol",
            "status": "under_maintenance",
            "owner": {"name": "Ana", "monthly_rent_amount": 1500.0, "rent_start_date": "2025-03-01"},
            "created_at": "2025-03-01T00:00:00Z"
        });
        let property: Property = serde_json::from_value(row).expect("valid property row");
        assert_eq!(property.status, PropertyStatus::UnderMaintenance);
        let owner = property.payable_owner().expect("payable owner");
        assert_eq!(owner.rent_start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn owner_requires_name_and_positive_amount() {
        let blank = OwnerConfig {
            name: "  ".to_string(),
            monthly_rent_amount: 100.0,
            rent_start_date: None,
        };
        let zero = OwnerConfig {
            name: "Ana".to_string(),
            monthly_rent_amount: 0.0,
            rent_start_date: None,
        };
        assert!(!blank.is_payable());
        assert!(!zero.is_payable());
    }

    #[test]
    fn patch_can_clear_lease_end() {
        let mut tenant = Tenant {
            id: "t-1".to_string(),
            property_id: "p-1".to_string(),
            full_name: "Luis".to_string(),
            email: None,
            lease_start: NaiveDate::from_ymd_opt(2026, 1, 1),
            lease_end: NaiveDate::from_ymd_opt(2026, 12, 31),
            monthly_rent: 900.0,
            status: TenantStatus::Active,
        };
        let patch = TenantPatch {
            lease_end: Some(None),
            monthly_rent: Some(950.0),
            ..TenantPatch::default()
        };
        patch.apply_to(&mut tenant);
        assert_eq!(tenant.lease_end, None);
        assert_eq!(tenant.monthly_rent, 950.0);
    }
}
