use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::post,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::CorsConfig,
    middleware::logging,
    routes::{crawl, method_not_allowed, preflight::preflight, query},
    state::AppState,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route(
            "/crawl",
            post(crawl::crawl).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/query",
            post(query::query).options(preflight).fallback(method_not_allowed),
        );

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(logging::log_request));

    // The CORS layer answers every OPTIONS request itself; without it the
    // route-level pre-flight handler does.
    let router = if state.config.cors.enabled {
        router.layer(build_cors_layer(&state.config.cors))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if config.origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let parsed_origins: Vec<HeaderValue> = config
            .origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();

        cors.allow_origin(parsed_origins)
    }
}
