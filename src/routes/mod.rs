// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware
// - health.rs: Health check and metrics endpoints
// - users.rs: Registration, listing and block management
// - messages.rs: Direct and group message endpoints
// - groups.rs: Group creation and membership
// - extractors.rs: JSON body extractor with uniform 400 rejections
// - middleware.rs: Request logging
//
// ============================================================================

mod extractors;
mod groups;
mod health;
mod messages;
mod middleware;
mod users;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    let request_timeout = Duration::from_secs(app_context.config.request_timeout_secs);

    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Users
        .route("/users/register", post(users::register_user))
        .route("/users", get(users::get_users))
        .route("/users/check-block", get(users::check_block_status))
        .route("/users/block", post(users::manage_block))
        // Messages
        .route("/messages/send", post(messages::send_message))
        .route("/messages", get(messages::get_messages))
        .route("/messages/group/send", post(messages::send_group_message))
        // Groups
        .route("/groups/create", post(groups::create_group))
        .route("/groups/manage", post(groups::manage_group_members))
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                // Bounds every request, including stuck storage calls.
                .layer(TimeoutLayer::new(request_timeout))
                .into_inner(),
        )
        .with_state(app_context)
}
