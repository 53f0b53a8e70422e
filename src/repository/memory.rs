//! In-process store used by service tests. Mirrors the Postgres semantics
//! the engine relies on: half-open range lookups and the narrow purge.

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use super::{ListPage, ObligationKind, ObligationStore, PropertyRepository, TenantRepository};
use crate::error::{AppError, AppResult};
use crate::models::{
    InvoiceStatus, NewOwnerPayout, NewProperty, NewRentInvoice, NewTenant, OwnerPayout, Property,
    PropertyPatch, PropertyStatus, RentInvoice, Tenant, TenantPatch, TenantStatus,
};

#[derive(Debug, Default)]
struct Tables {
    tenants: Vec<Tenant>,
    properties: Vec<Property>,
    rent_invoices: Vec<RentInvoice>,
    owner_payouts: Vec<OwnerPayout>,
}

/// A concurrent write applied just before the next occupancy status write,
/// after the synchronizer has already read the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrentWrite {
    EnterMaintenance,
    DeleteProperty,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes_after: Mutex<Option<usize>>,
    before_status_write: Mutex<Option<ConcurrentWrite>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allow `count` more obligation inserts, then fail every insert with a
    /// dependency error.
    pub fn fail_obligation_writes_after(&self, count: usize) {
        *self
            .fail_writes_after
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(count);
    }

    fn consume_write_budget(&self) -> AppResult<()> {
        let mut budget = self
            .fail_writes_after
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match budget.as_mut() {
            Some(0) => Err(AppError::Dependency("Database operation failed.".to_string())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn interleave_before_status_write(&self, write: ConcurrentWrite) {
        *self
            .before_status_write
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(write);
    }

    fn take_interleaved_write(&self) -> Option<ConcurrentWrite> {
        self.before_status_write
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Insert an invoice as-is, bypassing the generators.
    pub fn seed_rent_invoice(&self, invoice: NewRentInvoice) -> RentInvoice {
        let row = RentInvoice {
            id: new_id(),
            tenant_id: invoice.tenant_id,
            property_id: invoice.property_id,
            amount: invoice.amount,
            due_date: invoice.due_date,
            status: invoice.status,
        };
        self.tables().rent_invoices.push(row.clone());
        row
    }

    pub fn seed_owner_payout(&self, payout: NewOwnerPayout) -> OwnerPayout {
        let row = OwnerPayout {
            id: new_id(),
            property_id: payout.property_id,
            amount: payout.amount,
            payment_month: payout.payment_month,
            status: payout.status,
        };
        self.tables().owner_payouts.push(row.clone());
        row
    }

    pub fn all_rent_invoices(&self) -> Vec<RentInvoice> {
        self.tables().rent_invoices.clone()
    }

    pub fn all_owner_payouts(&self) -> Vec<OwnerPayout> {
        self.tables().owner_payouts.clone()
    }
}

fn paginate<T>(rows: Vec<T>, page: ListPage) -> Vec<T> {
    let offset = usize::try_from(page.offset.max(0)).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit.max(1)).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl TenantRepository for MemoryStore {
    async fn get_tenant(&self, id: &str) -> AppResult<Option<Tenant>> {
        Ok(self
            .tables()
            .tenants
            .iter()
            .find(|tenant| tenant.id == id)
            .cloned())
    }

    async fn create_tenant(&self, input: NewTenant) -> AppResult<Tenant> {
        let tenant = Tenant {
            id: new_id(),
            property_id: input.property_id,
            full_name: input.full_name,
            email: input.email,
            lease_start: input.lease_start,
            lease_end: input.lease_end,
            monthly_rent: input.monthly_rent,
            status: input.status,
        };
        self.tables().tenants.push(tenant.clone());
        Ok(tenant)
    }

    async fn update_tenant(&self, id: &str, patch: TenantPatch) -> AppResult<Tenant> {
        let mut tables = self.tables();
        let tenant = tables
            .tenants
            .iter_mut()
            .find(|tenant| tenant.id == id)
            .ok_or_else(|| AppError::NotFound("tenants record not found.".to_string()))?;
        patch.apply_to(tenant);
        Ok(tenant.clone())
    }

    async fn delete_tenant(&self, id: &str) -> AppResult<Tenant> {
        let mut tables = self.tables();
        let position = tables
            .tenants
            .iter()
            .position(|tenant| tenant.id == id)
            .ok_or_else(|| AppError::NotFound("tenants record not found.".to_string()))?;
        Ok(tables.tenants.remove(position))
    }

    async fn count_active_tenants(&self, property_id: &str) -> AppResult<u64> {
        Ok(self
            .tables()
            .tenants
            .iter()
            .filter(|tenant| {
                tenant.property_id == property_id && tenant.status == TenantStatus::Active
            })
            .count() as u64)
    }
}

impl PropertyRepository for MemoryStore {
    async fn get_property(&self, id: &str) -> AppResult<Option<Property>> {
        Ok(self
            .tables()
            .properties
            .iter()
            .find(|property| property.id == id)
            .cloned())
    }

    async fn create_property(&self, input: NewProperty) -> AppResult<Property> {
        let property = Property {
            id: new_id(),
            name: input.name,
            address: input.address,
            status: input.status,
            owner: input.owner,
        };
        self.tables().properties.push(property.clone());
        Ok(property)
    }

    async fn update_property(&self, id: &str, patch: PropertyPatch) -> AppResult<Property> {
        let mut tables = self.tables();
        let property = tables
            .properties
            .iter_mut()
            .find(|property| property.id == id)
            .ok_or_else(|| AppError::NotFound("properties record not found.".to_string()))?;
        if let Some(name) = patch.name {
            property.name = name;
        }
        if let Some(address) = patch.address {
            property.address = Some(address);
        }
        if let Some(status) = patch.status {
            property.status = status;
        }
        if let Some(owner) = patch.owner {
            property.owner = Some(owner);
        }
        Ok(property.clone())
    }

    async fn set_occupancy_status(&self, id: &str, status: PropertyStatus) -> AppResult<bool> {
        let interleaved = self.take_interleaved_write();
        let mut tables = self.tables();
        match interleaved {
            Some(ConcurrentWrite::EnterMaintenance) => {
                if let Some(property) = tables.properties.iter_mut().find(|p| p.id == id) {
                    property.status = PropertyStatus::UnderMaintenance;
                }
            }
            Some(ConcurrentWrite::DeleteProperty) => {
                tables.properties.retain(|property| property.id != id);
            }
            None => {}
        }

        let property = tables
            .properties
            .iter_mut()
            .find(|property| property.id == id)
            .ok_or_else(|| AppError::NotFound("properties record not found.".to_string()))?;
        if property.status == PropertyStatus::UnderMaintenance {
            return Ok(false);
        }
        property.status = status;
        Ok(true)
    }

    async fn list_properties_with_payable_owner(&self) -> AppResult<Vec<Property>> {
        Ok(self
            .tables()
            .properties
            .iter()
            .filter(|property| property.payable_owner().is_some())
            .cloned()
            .collect())
    }
}

impl ObligationStore for MemoryStore {
    async fn obligation_exists_between(
        &self,
        kind: ObligationKind,
        subject_id: &str,
        from: NaiveDate,
        until: NaiveDate,
    ) -> AppResult<bool> {
        let tables = self.tables();
        let in_range = |date: NaiveDate| date >= from && date < until;
        Ok(match kind {
            ObligationKind::RentInvoice => tables
                .rent_invoices
                .iter()
                .any(|invoice| invoice.tenant_id == subject_id && in_range(invoice.due_date)),
            ObligationKind::OwnerPayout => tables
                .owner_payouts
                .iter()
                .any(|payout| payout.property_id == subject_id && in_range(payout.payment_month)),
        })
    }

    async fn create_rent_invoice(&self, input: NewRentInvoice) -> AppResult<RentInvoice> {
        self.consume_write_budget()?;
        Ok(self.seed_rent_invoice(input))
    }

    async fn delete_pending_invoices_due_after(
        &self,
        tenant_id: &str,
        after: NaiveDate,
    ) -> AppResult<u64> {
        let mut tables = self.tables();
        let before = tables.rent_invoices.len();
        tables.rent_invoices.retain(|invoice| {
            !(invoice.tenant_id == tenant_id
                && invoice.status == InvoiceStatus::Pending
                && invoice.due_date > after)
        });
        Ok((before - tables.rent_invoices.len()) as u64)
    }

    async fn list_rent_invoices(
        &self,
        tenant_id: &str,
        page: ListPage,
    ) -> AppResult<Vec<RentInvoice>> {
        let mut invoices = self
            .tables()
            .rent_invoices
            .iter()
            .filter(|invoice| invoice.tenant_id == tenant_id)
            .cloned()
            .collect::<Vec<_>>();
        invoices.sort_by_key(|invoice| invoice.due_date);
        Ok(paginate(invoices, page))
    }

    async fn create_owner_payout(&self, input: NewOwnerPayout) -> AppResult<OwnerPayout> {
        self.consume_write_budget()?;
        Ok(self.seed_owner_payout(input))
    }

    async fn list_owner_payouts(
        &self,
        property_id: &str,
        page: ListPage,
    ) -> AppResult<Vec<OwnerPayout>> {
        let mut payouts = self
            .tables()
            .owner_payouts
            .iter()
            .filter(|payout| payout.property_id == property_id)
            .cloned()
            .collect::<Vec<_>>();
        payouts.sort_by_key(|payout| payout.payment_month);
        Ok(paginate(payouts, page))
    }
}
