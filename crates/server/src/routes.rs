use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};
use tracing::Level;

use common::types::Health;

use crate::errors::method_not_allowed;
use crate::state::ServerState;

pub mod admin;
pub mod bookings;
pub mod collections;

pub async fn health() -> Json<Health> {
    Json(Health { status: "Operational", version: env!("CARGO_PKG_VERSION") })
}

/// Router-level knobs that do not belong in handler state.
#[derive(Clone, Debug)]
pub struct RouterSettings {
    pub static_dir: String,
    pub body_limit_bytes: usize,
}

/// Build the full application router: documents, bookings, admin and static site.
pub fn build_router(state: ServerState, cors: CorsLayer, settings: RouterSettings) -> Router {
    let write_guard = middleware::from_fn_with_state(state.clone(), admin::require_write_key);

    // Public routes (health + published documents as plain files)
    let public = Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/data/:file", get(collections::public_document).fallback(method_not_allowed));

    // Whole-document collections; only writes are gated
    let documents = Router::new()
        .route(
            "/collections/:name",
            get(collections::get_collection)
                .merge(post(collections::put_collection).route_layer(write_guard.clone()))
                .fallback(method_not_allowed),
        )
        .route(
            "/api/get-json",
            get(collections::legacy_get_military).fallback(method_not_allowed),
        )
        .route(
            "/api/save-json",
            post(collections::legacy_save_military)
                .route_layer(write_guard.clone())
                .fallback(method_not_allowed),
        )
        .route(
            "/api/upload",
            post(collections::legacy_upload_published)
                .route_layer(write_guard.clone())
                .fallback(method_not_allowed),
        );

    let booking_routes = Router::new()
        .route(
            "/api/bookings",
            get(bookings::list_bookings)
                .merge(post(bookings::add_booking).route_layer(write_guard.clone()))
                .fallback(method_not_allowed),
        )
        .route("/api/bookings/stats", get(bookings::booking_stats).fallback(method_not_allowed))
        .route(
            "/api/bookings/:id",
            delete(bookings::delete_booking)
                .route_layer(write_guard)
                .fallback(method_not_allowed),
        );

    // Admin routes always need a key, reads included
    let admin_routes = Router::new()
        .route(
            "/admin/api-keys",
            get(admin::list_api_keys).post(admin::set_api_key).fallback(method_not_allowed),
        )
        .route("/admin/api-keys/:user", delete(admin::delete_api_key).fallback(method_not_allowed))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin::require_admin_key));

    public
        .merge(documents)
        .merge(booking_routes)
        .merge(admin_routes)
        .fallback_service(ServeDir::new(&settings.static_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(settings.body_limit_bytes))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
