//! Tenant writes with their derived-state hooks.
//!
//! Every successful create, update, or delete resynchronizes occupancy for
//! the affected properties. Invoice generation stays with the caller; the
//! helpers at the bottom tell it which mode a write calls for.

use serde::Serialize;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::{NewTenant, Tenant, TenantPatch, TenantStatus};
use crate::repository::{PropertyRepository, TenantRepository};
use crate::services::occupancy::{sync_property_occupancy, OccupancySync};
use crate::services::rent_invoices::InvoiceMode;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantWrite {
    pub tenant: Tenant,
    /// One entry per property touched by the write; `None` when the sync
    /// itself failed and was logged.
    pub occupancy: Vec<Option<OccupancySync>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TenantUpdate {
    pub before: Tenant,
    pub write: TenantWrite,
}

pub async fn create_tenant<S>(store: &S, input: NewTenant) -> AppResult<TenantWrite>
where
    S: TenantRepository + PropertyRepository,
{
    let tenant = store.create_tenant(input).await?;
    let occupancy = vec![sync_best_effort(store, &tenant.property_id).await];
    Ok(TenantWrite { tenant, occupancy })
}

pub async fn update_tenant<S>(store: &S, tenant_id: &str, patch: TenantPatch) -> AppResult<TenantUpdate>
where
    S: TenantRepository + PropertyRepository,
{
    let before = store
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("tenants record not found.".to_string()))?;
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update.".to_string()));
    }
    let mut candidate = before.clone();
    patch.apply_to(&mut candidate);
    if let (Some(start), Some(end)) = (candidate.lease_start, candidate.lease_end) {
        if end < start {
            return Err(AppError::UnprocessableEntity(
                "lease_end must not be before lease_start.".to_string(),
            ));
        }
    }

    let tenant = store.update_tenant(tenant_id, patch).await?;
    let mut occupancy = vec![sync_best_effort(store, &tenant.property_id).await];
    if before.property_id != tenant.property_id {
        occupancy.push(sync_best_effort(store, &before.property_id).await);
    }

    Ok(TenantUpdate {
        before,
        write: TenantWrite { tenant, occupancy },
    })
}

pub async fn delete_tenant<S>(store: &S, tenant_id: &str) -> AppResult<TenantWrite>
where
    S: TenantRepository + PropertyRepository,
{
    let tenant = store.delete_tenant(tenant_id).await?;
    let occupancy = vec![sync_best_effort(store, &tenant.property_id).await];
    Ok(TenantWrite { tenant, occupancy })
}

/// Invoice mode owed to a freshly created tenant.
pub fn invoice_mode_after_create(tenant: &Tenant) -> Option<InvoiceMode> {
    (tenant.status == TenantStatus::Active).then_some(InvoiceMode::Backfill)
}

/// Invoice mode owed after an update: forward regeneration when anything the
/// future schedule depends on changed.
pub fn invoice_mode_after_update(before: &Tenant, after: &Tenant) -> Option<InvoiceMode> {
    schedule_inputs_changed(before, after).then_some(InvoiceMode::Forward)
}

fn schedule_inputs_changed(before: &Tenant, after: &Tenant) -> bool {
    before.lease_start != after.lease_start
        || before.lease_end != after.lease_end
        || before.monthly_rent != after.monthly_rent
        || before.status != after.status
        || before.property_id != after.property_id
}

async fn sync_best_effort<S>(store: &S, property_id: &str) -> Option<OccupancySync>
where
    S: TenantRepository + PropertyRepository,
{
    match sync_property_occupancy(store, property_id).await {
        Ok(outcome) => Some(outcome),
        Err(error) => {
            warn!(property_id, error = %error, "Occupancy sync failed");
            None
        }
    }
}
