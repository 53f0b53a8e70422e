use chrono::NaiveDate;

use crate::error::AppResult;
use crate::repository::{ObligationKind, ObligationStore};
use crate::services::month_cursor::{month_start, next_month};

/// Whether `subject_id` already has an obligation of `kind` in `month`.
///
/// Looks at the half-open interval `[month_start, next_month)` rather than
/// matching the first-of-month date exactly, so rows inserted by hand with
/// a mid-month date still count.
pub async fn obligation_exists<S: ObligationStore>(
    store: &S,
    kind: ObligationKind,
    subject_id: &str,
    month: NaiveDate,
) -> AppResult<bool> {
    let from = month_start(month);
    let until = next_month(from);
    store
        .obligation_exists_between(kind, subject_id, from, until)
        .await
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::obligation_exists;
    use crate::models::{InvoiceStatus, NewRentInvoice};
    use crate::repository::{memory::MemoryStore, ObligationKind};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[tokio::test]
    async fn detects_mid_month_rows_within_the_month_only() {
        let store = MemoryStore::new();
        store.seed_rent_invoice(NewRentInvoice {
            tenant_id: "t-1".to_string(),
            property_id: "p-1".to_string(),
            amount: 700.0,
            due_date: date(2026, 4, 17),
            status: InvoiceStatus::Paid,
        });

        let april = date(2026, 4, 1);
        assert!(obligation_exists(&store, ObligationKind::RentInvoice, "t-1", april)
            .await
            .expect("lookup"));
        assert!(!obligation_exists(&store, ObligationKind::RentInvoice, "t-1", date(2026, 5, 1))
            .await
            .expect("lookup"));
        assert!(!obligation_exists(&store, ObligationKind::RentInvoice, "t-2", april)
            .await
            .expect("lookup"));
        assert!(!obligation_exists(&store, ObligationKind::OwnerPayout, "t-1", april)
            .await
            .expect("lookup"));
    }

    #[tokio::test]
    async fn normalizes_the_queried_month() {
        let store = MemoryStore::new();
        store.seed_rent_invoice(NewRentInvoice {
            tenant_id: "t-1".to_string(),
            property_id: "p-1".to_string(),
            amount: 700.0,
            due_date: date(2026, 1, 1),
            status: InvoiceStatus::Pending,
        });

        assert!(obligation_exists(&store, ObligationKind::RentInvoice, "t-1", date(2026, 1, 31))
            .await
            .expect("lookup"));
        assert!(!obligation_exists(&store, ObligationKind::RentInvoice, "t-1", date(2025, 12, 31))
            .await
            .expect("lookup"));
    }
}
