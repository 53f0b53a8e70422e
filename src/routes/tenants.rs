use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    repository::{ObligationStore, TenantRepository},
    schemas::{
        validate_input, CreateTenantInput, GenerateInvoicesInput, ListQuery, TenantPath,
        UpdateTenantInput,
    },
    services::{
        rent_invoices::{generate_rent_invoices, InvoiceRunResult},
        tenant_lifecycle::{
            create_tenant as create_tenant_record, delete_tenant as delete_tenant_record,
            invoice_mode_after_create, invoice_mode_after_update,
            update_tenant as update_tenant_record,
        },
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/tenants", axum::routing::post(create_tenant))
        .route(
            "/tenants/{tenant_id}",
            axum::routing::get(get_tenant)
                .patch(update_tenant)
                .delete(delete_tenant),
        )
        .route(
            "/tenants/{tenant_id}/rent-invoices",
            axum::routing::get(list_rent_invoices),
        )
        .route(
            "/tenants/{tenant_id}/rent-invoices/generate",
            axum::routing::post(generate_invoices),
        )
}

async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let store = state.store()?;

    let written = create_tenant_record(&store, payload.into_new_tenant()?).await?;
    let invoices: Option<InvoiceRunResult> = match invoice_mode_after_create(&written.tenant) {
        Some(mode) => Some(
            generate_rent_invoices(
                &store,
                &written.tenant.id,
                mode,
                state.config.today(),
                state.config.obligation_horizon_months,
            )
            .await?,
        ),
        None => None,
    };

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "tenant": written.tenant,
            "occupancy": written.occupancy,
            "invoices": invoices,
        })),
    ))
}

async fn get_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> AppResult<Json<Value>> {
    let store = state.store()?;
    let tenant = store
        .get_tenant(&path.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("tenants record not found.".to_string()))?;
    Ok(Json(json!(tenant)))
}

async fn update_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Json(payload): Json<UpdateTenantInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let store = state.store()?;

    let updated = update_tenant_record(&store, &path.tenant_id, payload.into_patch()).await?;
    let invoices = match invoice_mode_after_update(&updated.before, &updated.write.tenant) {
        Some(mode) => Some(
            generate_rent_invoices(
                &store,
                &path.tenant_id,
                mode,
                state.config.today(),
                state.config.obligation_horizon_months,
            )
            .await?,
        ),
        None => None,
    };

    Ok(Json(json!({
        "tenant": updated.write.tenant,
        "occupancy": updated.write.occupancy,
        "invoices": invoices,
    })))
}

async fn delete_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> AppResult<Json<Value>> {
    let store = state.store()?;
    let deleted = delete_tenant_record(&store, &path.tenant_id).await?;
    Ok(Json(json!({
        "tenant": deleted.tenant,
        "occupancy": deleted.occupancy,
    })))
}

async fn list_rent_invoices(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let store = state.store()?;
    let page = query.page();
    let rows = store.list_rent_invoices(&path.tenant_id, page).await?;
    Ok(Json(json!({
        "data": rows,
        "limit": page.limit,
        "offset": page.offset,
    })))
}

async fn generate_invoices(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Json(payload): Json<GenerateInvoicesInput>,
) -> AppResult<Json<Value>> {
    let store = state.store()?;
    let result = generate_rent_invoices(
        &store,
        &path.tenant_id,
        payload.mode,
        state.config.today(),
        state.config.obligation_horizon_months,
    )
    .await?;
    Ok(Json(json!({ "mode": payload.mode.as_str(), "result": result })))
}
