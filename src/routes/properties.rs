use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::PropertyPatch,
    repository::{ObligationStore, PropertyRepository},
    schemas::{
        validate_input, CreatePropertyInput, GeneratePayoutsInput, ListQuery, PropertyPath,
        UpdatePropertyInput,
    },
    services::owner_payouts::{
        generate_owner_payouts, PayoutLimits, PayoutRunResult, PayoutWindow,
    },
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/properties", axum::routing::post(create_property))
        .route(
            "/properties/{property_id}",
            axum::routing::get(get_property).patch(update_property),
        )
        .route(
            "/properties/{property_id}/owner-payouts",
            axum::routing::get(list_owner_payouts),
        )
        .route(
            "/properties/{property_id}/owner-payouts/generate",
            axum::routing::post(generate_payouts),
        )
}

async fn create_property(
    State(state): State<AppState>,
    Json(payload): Json<CreatePropertyInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let store = state.store()?;

    let created = store.create_property(payload.into()).await?;
    let payouts: Option<PayoutRunResult> = if created.payable_owner().is_some() {
        Some(full_payout_run(&state, &store, &created.id, None).await?)
    } else {
        None
    };

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({ "property": created, "payouts": payouts })),
    ))
}

async fn get_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
) -> AppResult<Json<Value>> {
    let store = state.store()?;
    let property = store
        .get_property(&path.property_id)
        .await?
        .ok_or_else(|| AppError::NotFound("properties record not found.".to_string()))?;
    Ok(Json(json!(property)))
}

async fn update_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Json(payload): Json<UpdatePropertyInput>,
) -> AppResult<Json<Value>> {
    validate_input(&payload)?;
    let patch = PropertyPatch::from(payload);
    if patch == PropertyPatch::default() {
        return Err(AppError::BadRequest("No fields to update.".to_string()));
    }
    let store = state.store()?;

    let before = store
        .get_property(&path.property_id)
        .await?
        .ok_or_else(|| AppError::NotFound("properties record not found.".to_string()))?;
    let updated = store.update_property(&path.property_id, patch).await?;

    // Only the first payable owner configuration seeds the payout schedule.
    // Later edits are picked up by the monthly sweep.
    let payouts = if before.payable_owner().is_none() && updated.payable_owner().is_some() {
        Some(full_payout_run(&state, &store, &updated.id, None).await?)
    } else {
        None
    };

    Ok(Json(json!({ "property": updated, "payouts": payouts })))
}

async fn list_owner_payouts(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let store = state.store()?;
    let page = query.page();
    let rows = store.list_owner_payouts(&path.property_id, page).await?;
    Ok(Json(json!({
        "data": rows,
        "limit": page.limit,
        "offset": page.offset,
    })))
}

async fn generate_payouts(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Json(payload): Json<GeneratePayoutsInput>,
) -> AppResult<Json<Value>> {
    let store = state.store()?;
    let result = full_payout_run(&state, &store, &path.property_id, payload.start_month).await?;
    Ok(Json(json!({ "result": result })))
}

async fn full_payout_run<S>(
    state: &AppState,
    store: &S,
    property_id: &str,
    start_override: Option<chrono::NaiveDate>,
) -> AppResult<PayoutRunResult>
where
    S: PropertyRepository + ObligationStore,
{
    generate_owner_payouts(
        store,
        property_id,
        PayoutWindow::Full { start_override },
        state.config.today(),
        PayoutLimits {
            lookback_months: state.config.owner_payout_lookback_months,
            horizon_months: state.config.obligation_horizon_months,
        },
    )
    .await
}
