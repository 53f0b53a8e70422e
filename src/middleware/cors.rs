use axum::http::header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;

pub fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let headers = vec![
        ACCEPT,
        AUTHORIZATION,
        CONTENT_TYPE,
        HeaderName::from_static("x-internal-api-key"),
    ];

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(headers);

    if allows_any_origin(&config.cors_origins) {
        layer.allow_origin(Any).allow_credentials(false)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect::<Vec<_>>();
        layer.allow_origin(origins).allow_credentials(true)
    }
}

fn allows_any_origin(origins: &[String]) -> bool {
    origins.iter().any(|origin| origin.trim() == "*")
}

#[cfg(test)]
mod tests {
    use super::allows_any_origin;

    #[test]
    fn wildcard_origin_is_detected() {
        assert!(allows_any_origin(&["https://app.rentflow.io".to_string(), " * ".to_string()]));
        assert!(!allows_any_origin(&["http://localhost:3000".to_string()]));
    }
}
