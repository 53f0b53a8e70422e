use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{InvoiceStatus, NewRentInvoice, Tenant, TenantStatus};
use crate::repository::{ObligationKind, ObligationStore, TenantRepository};
use crate::services::dedup_guard::obligation_exists;
use crate::services::month_cursor::{
    add_months, earlier_month, month_less_than, month_start, months_inclusive,
};

const MAX_HORIZON_MONTHS: u32 = 120;

/// Which schedule a generation run rebuilds. Selected by the caller: creation
/// backfills, lease/rent/status updates regenerate forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceMode {
    Backfill,
    Forward,
}

impl InvoiceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backfill => "backfill",
            Self::Forward => "forward",
        }
    }
}

/// Why a run produced nothing without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceIneligibility {
    TenantNotFound,
    TenantNotActive,
    MissingLeaseStart,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvoiceRunResult {
    pub created: u32,
    pub skipped_existing: u32,
    pub purged: u64,
    pub ineligible: Option<InvoiceIneligibility>,
}

impl InvoiceRunResult {
    fn ineligible(reason: InvoiceIneligibility) -> Self {
        Self {
            ineligible: Some(reason),
            ..Self::default()
        }
    }
}

pub async fn generate_rent_invoices<S>(
    store: &S,
    tenant_id: &str,
    mode: InvoiceMode,
    today: NaiveDate,
    horizon_months: u32,
) -> AppResult<InvoiceRunResult>
where
    S: TenantRepository + ObligationStore,
{
    match mode {
        InvoiceMode::Backfill => generate_backfill_invoices(store, tenant_id, today).await,
        InvoiceMode::Forward => {
            generate_forward_invoices(store, tenant_id, today, horizon_months).await
        }
    }
}

/// Create invoices from the lease start through the current month (or the
/// lease end, if earlier). Months before the current one are created
/// `overdue`; the current month is `pending`. Never creates future invoices.
pub async fn generate_backfill_invoices<S>(
    store: &S,
    tenant_id: &str,
    today: NaiveDate,
) -> AppResult<InvoiceRunResult>
where
    S: TenantRepository + ObligationStore,
{
    let (tenant, lease_start) = match load_eligible_tenant(store, tenant_id).await? {
        Ok(eligible) => eligible,
        Err(reason) => {
            debug!(tenant_id, reason = ?reason, "Backfill skipped");
            return Ok(InvoiceRunResult::ineligible(reason));
        }
    };

    let current_month = month_start(today);
    let end = match tenant.lease_end {
        Some(lease_end) => earlier_month(lease_end, current_month),
        None => current_month,
    };

    let mut result = InvoiceRunResult::default();
    for month in months_inclusive(lease_start, end) {
        let status = if month_less_than(month, current_month) {
            InvoiceStatus::Overdue
        } else {
            InvoiceStatus::Pending
        };
        write_month(store, &tenant, month, status, &mut result).await?;
    }

    info!(
        tenant_id,
        mode = InvoiceMode::Backfill.as_str(),
        created = result.created,
        skipped_existing = result.skipped_existing,
        "Rent invoice generation completed"
    );
    Ok(result)
}

/// Purge future pending invoices, then create `pending` invoices from the
/// current month through the lease end or `horizon_months` ahead, whichever
/// comes first.
pub async fn generate_forward_invoices<S>(
    store: &S,
    tenant_id: &str,
    today: NaiveDate,
    horizon_months: u32,
) -> AppResult<InvoiceRunResult>
where
    S: TenantRepository + ObligationStore,
{
    let (tenant, _) = match load_eligible_tenant(store, tenant_id).await? {
        Ok(eligible) => eligible,
        Err(reason) => {
            debug!(tenant_id, reason = ?reason, "Forward regeneration skipped");
            return Ok(InvoiceRunResult::ineligible(reason));
        }
    };

    let mut result = InvoiceRunResult {
        purged: store
            .delete_pending_invoices_due_after(&tenant.id, today)
            .await?,
        ..InvoiceRunResult::default()
    };

    let horizon_end = add_months(today, horizon_months.min(MAX_HORIZON_MONTHS) as i32);
    let end = match tenant.lease_end {
        Some(lease_end) => earlier_month(lease_end, horizon_end),
        None => horizon_end,
    };

    for month in months_inclusive(today, end) {
        write_month(store, &tenant, month, InvoiceStatus::Pending, &mut result).await?;
    }

    info!(
        tenant_id,
        mode = InvoiceMode::Forward.as_str(),
        purged = result.purged,
        created = result.created,
        skipped_existing = result.skipped_existing,
        "Rent invoice generation completed"
    );
    Ok(result)
}

async fn load_eligible_tenant<S: TenantRepository>(
    store: &S,
    tenant_id: &str,
) -> AppResult<Result<(Tenant, NaiveDate), InvoiceIneligibility>> {
    let Some(tenant) = store.get_tenant(tenant_id).await? else {
        return Ok(Err(InvoiceIneligibility::TenantNotFound));
    };
    if tenant.status != TenantStatus::Active {
        return Ok(Err(InvoiceIneligibility::TenantNotActive));
    }
    let Some(lease_start) = tenant.lease_start else {
        return Ok(Err(InvoiceIneligibility::MissingLeaseStart));
    };
    Ok(Ok((tenant, lease_start)))
}

async fn write_month<S: ObligationStore>(
    store: &S,
    tenant: &Tenant,
    month: NaiveDate,
    status: InvoiceStatus,
    result: &mut InvoiceRunResult,
) -> AppResult<()> {
    if obligation_exists(store, ObligationKind::RentInvoice, &tenant.id, month).await? {
        result.skipped_existing += 1;
        return Ok(());
    }

    let invoice = NewRentInvoice {
        tenant_id: tenant.id.clone(),
        property_id: tenant.property_id.clone(),
        amount: tenant.monthly_rent,
        due_date: month,
        status,
    };
    match store.create_rent_invoice(invoice).await {
        Ok(_) => {
            debug!(
                tenant_id = %tenant.id,
                due_date = %month,
                status = status.as_str(),
                "Rent invoice created"
            );
            result.created += 1;
            Ok(())
        }
        // A concurrent writer won the unique index for this month.
        Err(AppError::Conflict(_)) => {
            result.skipped_existing += 1;
            Ok(())
        }
        Err(error) => Err(error),
    }
}
