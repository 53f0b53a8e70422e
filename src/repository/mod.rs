//! Data access seams for the obligation engine.
//!
//! Services are generic over these traits. `postgres::PgStore` is the
//! production implementation; `memory::MemoryStore` backs the tests.

use std::future::Future;

use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{
    NewOwnerPayout, NewProperty, NewRentInvoice, NewTenant, OwnerPayout, Property, PropertyPatch,
    PropertyStatus, RentInvoice, Tenant, TenantPatch,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod table_service;

/// Window over an obligation listing, ordered by date ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPage {
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListPage {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

/// Which monthly obligation collection a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationKind {
    RentInvoice,
    OwnerPayout,
}

impl ObligationKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::RentInvoice => "rent_invoices",
            Self::OwnerPayout => "owner_payouts",
        }
    }

    pub fn subject_column(self) -> &'static str {
        match self {
            Self::RentInvoice => "tenant_id",
            Self::OwnerPayout => "property_id",
        }
    }

    pub fn date_column(self) -> &'static str {
        match self {
            Self::RentInvoice => "due_date",
            Self::OwnerPayout => "payment_month",
        }
    }
}

pub trait TenantRepository: Send + Sync {
    /// `Ok(None)` when the tenant does not exist.
    fn get_tenant(&self, id: &str) -> impl Future<Output = AppResult<Option<Tenant>>> + Send;
    fn create_tenant(&self, input: NewTenant) -> impl Future<Output = AppResult<Tenant>> + Send;
    fn update_tenant(
        &self,
        id: &str,
        patch: TenantPatch,
    ) -> impl Future<Output = AppResult<Tenant>> + Send;
    /// Returns the deleted row.
    fn delete_tenant(&self, id: &str) -> impl Future<Output = AppResult<Tenant>> + Send;
    fn count_active_tenants(
        &self,
        property_id: &str,
    ) -> impl Future<Output = AppResult<u64>> + Send;
}

pub trait PropertyRepository: Send + Sync {
    /// `Ok(None)` when the property does not exist.
    fn get_property(&self, id: &str)
        -> impl Future<Output = AppResult<Option<Property>>> + Send;
    fn create_property(
        &self,
        input: NewProperty,
    ) -> impl Future<Output = AppResult<Property>> + Send;
    fn update_property(
        &self,
        id: &str,
        patch: PropertyPatch,
    ) -> impl Future<Output = AppResult<Property>> + Send;
    /// Writes a derived occupancy status. The write is guarded in the same
    /// statement: a property already `under_maintenance` is left alone and
    /// `Ok(false)` is returned. `NotFound` when the property is gone.
    fn set_occupancy_status(
        &self,
        id: &str,
        status: PropertyStatus,
    ) -> impl Future<Output = AppResult<bool>> + Send;
    /// Properties whose owner has a non-blank name and a positive amount.
    fn list_properties_with_payable_owner(
        &self,
    ) -> impl Future<Output = AppResult<Vec<Property>>> + Send;
}

pub trait ObligationStore: Send + Sync {
    /// True iff a record of `kind` exists for `subject_id` with its date in
    /// `[from, until)`.
    fn obligation_exists_between(
        &self,
        kind: ObligationKind,
        subject_id: &str,
        from: NaiveDate,
        until: NaiveDate,
    ) -> impl Future<Output = AppResult<bool>> + Send;
    fn create_rent_invoice(
        &self,
        input: NewRentInvoice,
    ) -> impl Future<Output = AppResult<RentInvoice>> + Send;
    /// Deletes invoices for the tenant that are `pending` and due strictly
    /// after `after`. Returns the number of deleted rows.
    fn delete_pending_invoices_due_after(
        &self,
        tenant_id: &str,
        after: NaiveDate,
    ) -> impl Future<Output = AppResult<u64>> + Send;
    fn list_rent_invoices(
        &self,
        tenant_id: &str,
        page: ListPage,
    ) -> impl Future<Output = AppResult<Vec<RentInvoice>>> + Send;
    fn create_owner_payout(
        &self,
        input: NewOwnerPayout,
    ) -> impl Future<Output = AppResult<OwnerPayout>> + Send;
    fn list_owner_payouts(
        &self,
        property_id: &str,
        page: ListPage,
    ) -> impl Future<Output = AppResult<Vec<OwnerPayout>>> + Send;
}
