use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{NewOwnerPayout, OwnerConfig, PayoutStatus, Property};
use crate::repository::{ObligationKind, ObligationStore, PropertyRepository};
use crate::services::dedup_guard::obligation_exists;
use crate::services::month_cursor::{add_months, later_month, month_start, months_inclusive};

const MAX_WINDOW_MONTHS: u32 = 120;

/// How far back and ahead an on-demand payout run reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutLimits {
    pub lookback_months: u32,
    pub horizon_months: u32,
}

impl Default for PayoutLimits {
    fn default() -> Self {
        Self {
            lookback_months: 12,
            horizon_months: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutWindow {
    /// From the rent start (or `start_override`), clamped to the lookback
    /// limit, through the horizon.
    Full { start_override: Option<NaiveDate> },
    /// Only the month containing "today". Used by the scheduled sweep.
    CurrentMonth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutIneligibility {
    PropertyNotFound,
    OwnerNotConfigured,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PayoutRunResult {
    pub created: u32,
    pub skipped_existing: u32,
    pub ineligible: Option<PayoutIneligibility>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PayoutSweepResult {
    pub properties_scanned: u32,
    pub created: u32,
    pub skipped_existing: u32,
    pub failed: u32,
}

pub async fn generate_owner_payouts<S>(
    store: &S,
    property_id: &str,
    window: PayoutWindow,
    today: NaiveDate,
    limits: PayoutLimits,
) -> AppResult<PayoutRunResult>
where
    S: PropertyRepository + ObligationStore,
{
    let Some(property) = store.get_property(property_id).await? else {
        return Ok(PayoutRunResult {
            ineligible: Some(PayoutIneligibility::PropertyNotFound),
            ..PayoutRunResult::default()
        });
    };
    generate_for_property(store, &property, window, today, limits).await
}

/// Generate the current month's payout for every property with a payable
/// owner. Properties run one after another; a failing property is logged
/// and counted, and the sweep moves on.
pub async fn run_owner_payout_sweep<S>(store: &S, today: NaiveDate) -> AppResult<PayoutSweepResult>
where
    S: PropertyRepository + ObligationStore,
{
    let properties = store.list_properties_with_payable_owner().await?;
    let mut sweep = PayoutSweepResult::default();

    for property in &properties {
        sweep.properties_scanned += 1;
        match generate_for_property(
            store,
            property,
            PayoutWindow::CurrentMonth,
            today,
            PayoutLimits::default(),
        )
        .await
        {
            Ok(result) => {
                sweep.created += result.created;
                sweep.skipped_existing += result.skipped_existing;
            }
            Err(error) => {
                warn!(property_id = %property.id, error = %error, "Owner payout generation failed");
                sweep.failed += 1;
            }
        }
    }

    info!(
        properties = sweep.properties_scanned,
        created = sweep.created,
        skipped_existing = sweep.skipped_existing,
        failed = sweep.failed,
        "Owner payout sweep completed"
    );
    Ok(sweep)
}

async fn generate_for_property<S: ObligationStore>(
    store: &S,
    property: &Property,
    window: PayoutWindow,
    today: NaiveDate,
    limits: PayoutLimits,
) -> AppResult<PayoutRunResult> {
    let Some(owner) = property.payable_owner() else {
        debug!(property_id = %property.id, "Owner payout skipped: owner not configured");
        return Ok(PayoutRunResult {
            ineligible: Some(PayoutIneligibility::OwnerNotConfigured),
            ..PayoutRunResult::default()
        });
    };

    let (start, end) = payout_range(owner, window, today, limits);
    let mut result = PayoutRunResult::default();
    for month in months_inclusive(start, end) {
        if obligation_exists(store, ObligationKind::OwnerPayout, &property.id, month).await? {
            result.skipped_existing += 1;
            continue;
        }

        let payout = NewOwnerPayout {
            property_id: property.id.clone(),
            amount: owner.monthly_rent_amount,
            payment_month: month,
            status: PayoutStatus::Pending,
        };
        match store.create_owner_payout(payout).await {
            Ok(_) => {
                debug!(property_id = %property.id, payment_month = %month, "Owner payout created");
                result.created += 1;
            }
            Err(AppError::Conflict(_)) => result.skipped_existing += 1,
            Err(error) => return Err(error),
        }
    }

    if !matches!(window, PayoutWindow::CurrentMonth) {
        info!(
            property_id = %property.id,
            from = %start,
            to = %end,
            created = result.created,
            skipped_existing = result.skipped_existing,
            "Owner payout generation completed"
        );
    }
    Ok(result)
}

fn payout_range(
    owner: &OwnerConfig,
    window: PayoutWindow,
    today: NaiveDate,
    limits: PayoutLimits,
) -> (NaiveDate, NaiveDate) {
    let current_month = month_start(today);
    match window {
        PayoutWindow::CurrentMonth => (current_month, current_month),
        PayoutWindow::Full { start_override } => {
            let lookback = limits.lookback_months.min(MAX_WINDOW_MONTHS) as i32;
            let horizon = limits.horizon_months.min(MAX_WINDOW_MONTHS) as i32;
            let floor = add_months(today, -lookback);
            let start = match start_override.or(owner.rent_start_date) {
                Some(requested) => later_month(requested, floor),
                None => current_month,
            };
            (start, add_months(today, horizon))
        }
    }
}
