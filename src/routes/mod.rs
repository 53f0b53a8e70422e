use axum::{routing::get, Router};

use crate::state::AppState;

pub mod health;
pub mod internal;
pub mod properties;
pub mod tenants;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(tenants::router())
        .merge(properties::router())
        .merge(internal::router())
}
