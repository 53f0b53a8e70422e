use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    services::owner_payouts::run_owner_payout_sweep,
    state::AppState,
};

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route(
        "/internal/owner-payouts/run",
        axum::routing::post(run_owner_payouts),
    )
}

/// Manual trigger for the monthly owner payout sweep.
async fn run_owner_payouts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Value>> {
    let api_key = headers
        .get("x-internal-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    validate_internal_api_key(
        state.config.is_production(),
        state.config.internal_api_key.as_deref(),
        api_key,
    )?;

    let store = state.store()?;
    let today = state.config.today();
    let summary = run_owner_payout_sweep(&store, today).await?;
    Ok(Json(json!({ "today": today, "summary": summary })))
}

fn validate_internal_api_key(
    is_production: bool,
    expected_key: Option<&str>,
    provided_key: &str,
) -> AppResult<()> {
    let expected = expected_key.map(str::trim).unwrap_or_default();

    if is_production && expected.is_empty() {
        return Err(AppError::Dependency(
            "INTERNAL_API_KEY must be set in production to run the payout sweep.".to_string(),
        ));
    }

    if !expected.is_empty() && provided_key != expected {
        return Err(AppError::Unauthorized(
            "Invalid or missing API key.".to_string(),
        ));
    }

    Ok(())
}
