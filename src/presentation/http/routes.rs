//! Route Configuration
//!
//! Public health/metrics routes at the root, everything else under `/api`
//! behind the rate limiter and the API-key gate. Mobile-facing groups use
//! Firebase ID tokens; the two internal user routes use service JWTs.

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer};

use super::handlers::{self, auth, channel, chat, config, health, user};
use crate::presentation::middleware::{
    create_cors_layer, create_security_headers_layer, create_trace_layer, expose_error_details, rate_limit,
    require_permissions, track_metrics, validate_api_key, verify_firebase_token, verify_internal_jwt,
    ErrorDetailsPolicy,
};
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    Router::new()
        .route("/", get(health::banner))
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(health::metrics_handler))
        .nest("/api", api_routes(&state))
        .route_layer(middleware::from_fn(track_metrics))
        .fallback(handlers::health::not_found)
        .layer(middleware::from_fn_with_state(
            ErrorDetailsPolicy::for_environment(settings.is_production()),
            expose_error_details,
        ))
        .layer(create_security_headers_layer(settings.is_production()))
        .layer(create_cors_layer(&settings.cors, settings.is_development()))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(settings.server.body_limit_bytes))
        .layer(create_trace_layer())
        .with_state(state)
}

/// `/api` routes; the limiter runs before the API-key check.
fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state))
        .nest("/users", user_routes(state))
        .nest("/chat", chat_routes(state))
        .nest("/channels", channel_routes(state))
        .nest("/config", config_routes(state))
        .route_layer(middleware::from_fn_with_state(state.clone(), validate_api_key))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh-token", post(auth::refresh_token))
        .route("/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/account", delete(auth::delete_account))
        .route("/logout", post(auth::logout))
        .route("/validate-token", get(auth::validate_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_firebase_token))
}

async fn require_users_write(request: Request, next: Next) -> Result<Response, AppError> {
    require_permissions(&["users:write"], request, next).await
}

async fn require_users_read(request: Request, next: Next) -> Result<Response, AppError> {
    require_permissions(&["users:read"], request, next).await
}

fn user_routes(state: &AppState) -> Router<AppState> {
    let internal = Router::new()
        .route(
            "/batch-update",
            post(user::batch_update).route_layer(middleware::from_fn(require_users_write)),
        )
        .route(
            "/stats",
            get(user::user_stats).route_layer(middleware::from_fn(require_users_read)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_internal_jwt));

    let mobile = Router::new()
        .route("/search", get(user::search_users))
        .route("/online", get(user::online_users))
        .route("/{user_id}", get(user::get_user))
        .route("/{user_id}/conversations", get(user::user_conversations))
        .route("/{user_id}/status", put(user::update_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_firebase_token));

    internal.merge(mobile)
}

fn chat_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/conversations", get(chat::conversations))
        .route("/dm", post(chat::create_direct_message))
        .route("/group", post(chat::create_group))
        .route(
            "/channel/{channel_id}",
            get(chat::get_channel).put(chat::update_channel).delete(chat::delete_channel),
        )
        .route(
            "/channel/{channel_id}/members",
            post(chat::add_members).delete(chat::remove_members),
        )
        .route("/channel/{channel_id}/analytics", get(chat::channel_analytics))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_firebase_token))
}

fn channel_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/public", get(channel::public_channels))
        .route("/search", get(channel::search_channels))
        .route("/trending", get(channel::trending_channels))
        .route("/{channel_id}/join", post(channel::join_channel))
        .route("/{channel_id}/leave", post(channel::leave_channel))
        .route("/{channel_id}/members", get(channel::channel_members))
        .route("/{channel_id}/messages", get(channel::channel_messages))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_firebase_token))
}

fn config_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/maps-key", get(config::maps_key))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_firebase_token))
}
