use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use sqlx::PgPool;

use super::table_service::{
    count_rows, create_row, delete_row, delete_rows, get_row, list_rows, map_db_error, read_rows,
    row_exists, update_row,
};
use super::{ListPage, ObligationKind, ObligationStore, PropertyRepository, TenantRepository};
use crate::error::{AppError, AppResult};
use crate::models::{
    InvoiceStatus, NewOwnerPayout, NewProperty, NewRentInvoice, NewTenant, OwnerPayout, Property,
    PropertyPatch, PropertyStatus, RentInvoice, Tenant, TenantPatch, TenantStatus,
};
use crate::schemas::{remove_nulls, serialize_to_map};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TenantRepository for PgStore {
    async fn get_tenant(&self, id: &str) -> AppResult<Option<Tenant>> {
        match get_row(&self.pool, "tenants", id, "id").await {
            Ok(row) => decode_row(row, "tenants").map(Some),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_tenant(&self, input: NewTenant) -> AppResult<Tenant> {
        let payload = remove_nulls(serialize_to_map(&input));
        let row = create_row(&self.pool, "tenants", &payload).await?;
        decode_row(row, "tenants")
    }

    async fn update_tenant(&self, id: &str, patch: TenantPatch) -> AppResult<Tenant> {
        let payload = tenant_patch_payload(&patch);
        let row = update_row(&self.pool, "tenants", id, &payload, "id").await?;
        decode_row(row, "tenants")
    }

    async fn delete_tenant(&self, id: &str) -> AppResult<Tenant> {
        let row = delete_row(&self.pool, "tenants", id, "id").await?;
        decode_row(row, "tenants")
    }

    async fn count_active_tenants(&self, property_id: &str) -> AppResult<u64> {
        let filters = json_map(&[
            ("property_id", Value::String(property_id.to_string())),
            ("status", Value::String(TenantStatus::Active.as_str().to_string())),
        ]);
        let total = count_rows(&self.pool, "tenants", Some(&filters)).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}

impl PropertyRepository for PgStore {
    async fn get_property(&self, id: &str) -> AppResult<Option<Property>> {
        match get_row(&self.pool, "properties", id, "id").await {
            Ok(row) => decode_row(row, "properties").map(Some),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_property(&self, input: NewProperty) -> AppResult<Property> {
        let payload = remove_nulls(serialize_to_map(&input));
        let row = create_row(&self.pool, "properties", &payload).await?;
        decode_row(row, "properties")
    }

    async fn update_property(&self, id: &str, patch: PropertyPatch) -> AppResult<Property> {
        let mut payload = Map::new();
        if let Some(name) = patch.name {
            payload.insert("name".to_string(), Value::String(name));
        }
        if let Some(address) = patch.address {
            payload.insert("address".to_string(), Value::String(address));
        }
        if let Some(status) = patch.status {
            payload.insert(
                "status".to_string(),
                Value::String(status.as_str().to_string()),
            );
        }
        if let Some(owner) = patch.owner {
            payload.insert("owner".to_string(), json!(owner));
        }
        let row = update_row(&self.pool, "properties", id, &payload, "id").await?;
        decode_row(row, "properties")
    }

    async fn set_occupancy_status(&self, id: &str, status: PropertyStatus) -> AppResult<bool> {
        let updated = sqlx::query(
            "UPDATE properties
                SET status = $2::property_status, updated_at = now()
              WHERE id::text = $1
                AND status <> 'under_maintenance'::property_status
             RETURNING id",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        if updated.is_some() {
            return Ok(true);
        }

        // Nothing matched: either the property is gone or it is under maintenance.
        match self.get_property(id).await? {
            Some(_) => Ok(false),
            None => Err(AppError::NotFound("properties record not found.".to_string())),
        }
    }

    async fn list_properties_with_payable_owner(&self) -> AppResult<Vec<Property>> {
        let rows = sqlx::query(
            "SELECT row_to_json(t) AS row
             FROM properties t
             WHERE t.owner IS NOT NULL
               AND btrim(COALESCE(t.owner->>'name', '')) <> ''
               AND COALESCE((t.owner->>'monthly_rent_amount')::numeric, 0) > 0
             ORDER BY t.created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        read_rows(rows)
            .into_iter()
            .map(|row| decode_row(row, "properties"))
            .collect()
    }
}

impl ObligationStore for PgStore {
    async fn obligation_exists_between(
        &self,
        kind: ObligationKind,
        subject_id: &str,
        from: NaiveDate,
        until: NaiveDate,
    ) -> AppResult<bool> {
        let date_column = kind.date_column();
        let from_key = format!("{date_column}__gte");
        let until_key = format!("{date_column}__lt");
        let filters = json_map(&[
            (kind.subject_column(), Value::String(subject_id.to_string())),
            (from_key.as_str(), Value::String(from.to_string())),
            (until_key.as_str(), Value::String(until.to_string())),
        ]);
        row_exists(&self.pool, kind.table(), &filters).await
    }

    async fn create_rent_invoice(&self, input: NewRentInvoice) -> AppResult<RentInvoice> {
        let payload = serialize_to_map(&input);
        let row = create_row(&self.pool, "rent_invoices", &payload).await?;
        decode_row(row, "rent_invoices")
    }

    async fn delete_pending_invoices_due_after(
        &self,
        tenant_id: &str,
        after: NaiveDate,
    ) -> AppResult<u64> {
        let filters = json_map(&[
            ("tenant_id", Value::String(tenant_id.to_string())),
            ("status", Value::String(InvoiceStatus::Pending.as_str().to_string())),
            ("due_date__gt", Value::String(after.to_string())),
        ]);
        delete_rows(&self.pool, "rent_invoices", &filters).await
    }

    async fn list_rent_invoices(
        &self,
        tenant_id: &str,
        page: ListPage,
    ) -> AppResult<Vec<RentInvoice>> {
        let filters = json_map(&[("tenant_id", Value::String(tenant_id.to_string()))]);
        let rows = list_rows(
            &self.pool,
            "rent_invoices",
            Some(&filters),
            page.limit,
            page.offset,
            "due_date",
            true,
        )
        .await?;
        rows.into_iter()
            .map(|row| decode_row(row, "rent_invoices"))
            .collect()
    }

    async fn create_owner_payout(&self, input: NewOwnerPayout) -> AppResult<OwnerPayout> {
        let payload = serialize_to_map(&input);
        let row = create_row(&self.pool, "owner_payouts", &payload).await?;
        decode_row(row, "owner_payouts")
    }

    async fn list_owner_payouts(
        &self,
        property_id: &str,
        page: ListPage,
    ) -> AppResult<Vec<OwnerPayout>> {
        let filters = json_map(&[("property_id", Value::String(property_id.to_string()))]);
        let rows = list_rows(
            &self.pool,
            "owner_payouts",
            Some(&filters),
            page.limit,
            page.offset,
            "payment_month",
            true,
        )
        .await?;
        rows.into_iter()
            .map(|row| decode_row(row, "owner_payouts"))
            .collect()
    }
}

fn tenant_patch_payload(patch: &TenantPatch) -> Map<String, Value> {
    let mut payload = Map::new();
    if let Some(property_id) = &patch.property_id {
        payload.insert("property_id".to_string(), Value::String(property_id.clone()));
    }
    if let Some(full_name) = &patch.full_name {
        payload.insert("full_name".to_string(), Value::String(full_name.clone()));
    }
    if let Some(email) = &patch.email {
        payload.insert("email".to_string(), Value::String(email.clone()));
    }
    if let Some(lease_start) = patch.lease_start {
        payload.insert("lease_start".to_string(), json!(lease_start));
    }
    if let Some(lease_end) = patch.lease_end {
        // Explicit null clears the column through jsonb_populate_record.
        payload.insert("lease_end".to_string(), json!(lease_end));
    }
    if let Some(monthly_rent) = patch.monthly_rent {
        payload.insert("monthly_rent".to_string(), json!(monthly_rent));
    }
    if let Some(status) = patch.status {
        payload.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
    }
    payload
}

fn decode_row<T: DeserializeOwned>(row: Value, table: &str) -> AppResult<T> {
    serde_json::from_value(row)
        .map_err(|error| AppError::Internal(format!("Malformed {table} row: {error}")))
}

fn json_map(entries: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in entries {
        map.insert((*key).to_string(), value.clone());
    }
    map
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::Value;

    use super::tenant_patch_payload;
    use crate::models::{TenantPatch, TenantStatus};

    #[test]
    fn tenant_patch_payload_keeps_explicit_lease_end_clear() {
        let patch = TenantPatch {
            lease_end: Some(None),
            status: Some(TenantStatus::Past),
            ..TenantPatch::default()
        };
        let payload = tenant_patch_payload(&patch);
        assert_eq!(payload.get("lease_end"), Some(&Value::Null));
        assert_eq!(
            payload.get("status").and_then(Value::as_str),
            Some("past")
        );
        assert!(!payload.contains_key("monthly_rent"));
    }

    #[test]
    fn tenant_patch_payload_renders_dates_as_iso() {
        let patch = TenantPatch {
            lease_start: NaiveDate::from_ymd_opt(2026, 2, 1),
            ..TenantPatch::default()
        };
        let payload = tenant_patch_payload(&patch);
        assert_eq!(
            payload.get("lease_start").and_then(Value::as_str),
            Some("2026-02-01")
        );
    }
}
