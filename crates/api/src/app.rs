use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use domain::services::notification::{LogNotifier, NotificationService};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, security_headers_middleware, trace_id};
use crate::routes::{
    admin_groups, admin_rules, admin_use_cases, groups, health, invitations, use_cases,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub notifier: Arc<dyn NotificationService>,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    create_app_with_notifier(config, pool, Arc::new(LogNotifier))
}

pub fn create_app_with_notifier(
    config: Config,
    pool: PgPool,
    notifier: Arc<dyn NotificationService>,
) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        pool,
        config: config.clone(),
        notifier,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Student-facing routes. Identity arrives via forwarded headers; role
    // preconditions are re-checked inside each handler.
    let student_routes = Router::new()
        .route("/api/v1/groups", post(groups::create_group))
        .route("/api/v1/groups/:group_id", get(groups::get_group))
        .route(
            "/api/v1/groups/:group_id/validation",
            get(groups::get_validation),
        )
        .route(
            "/api/v1/groups/:group_id/use-case",
            put(groups::change_use_case),
        )
        .route("/api/v1/groups/:group_id/lock", post(groups::lock_group))
        .route(
            "/api/v1/groups/:group_id/invitations",
            post(invitations::create_invitation),
        )
        .route(
            "/api/v1/invitations/:invitation_id/accept",
            post(invitations::accept_invitation),
        )
        .route(
            "/api/v1/invitations/:invitation_id/decline",
            post(invitations::decline_invitation),
        )
        .route("/api/v1/use-cases", get(use_cases::list_use_cases));

    // Admin routes.
    let admin_routes = Router::new()
        .route("/api/v1/admin/groups", get(admin_groups::list_groups))
        .route(
            "/api/v1/admin/groups/:group_id/validate",
            put(admin_groups::validate_group),
        )
        .route(
            "/api/v1/admin/groups/batch-validate",
            post(admin_groups::batch_validate),
        )
        .route(
            "/api/v1/admin/groups/:group_id/members",
            post(admin_groups::add_member),
        )
        .route(
            "/api/v1/admin/groups/:group_id/members/:user_id",
            delete(admin_groups::remove_member),
        )
        .route(
            "/api/v1/admin/use-cases",
            post(admin_use_cases::create_use_case),
        )
        .route(
            "/api/v1/admin/use-cases/:use_case_id",
            get(admin_use_cases::get_use_case)
                .put(admin_use_cases::update_use_case)
                .delete(admin_use_cases::deactivate_use_case),
        )
        .route(
            "/api/v1/admin/use-cases/:use_case_id/rules",
            post(admin_use_cases::attach_rule),
        )
        .route(
            "/api/v1/admin/rules",
            get(admin_rules::list_rules).post(admin_rules::create_rule),
        )
        .route(
            "/api/v1/admin/legacy-rules",
            get(admin_rules::list_legacy_rules).post(admin_rules::create_legacy_rule),
        );

    // Public routes (no identity headers required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(student_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn test_app() -> Router {
        let config = Config::load_for_test(&[]).unwrap();
        // Lazy pool: no connection is made until a query runs, which the
        // routes under test never do.
        let pool = PgPool::connect_lazy(&config.database.url).unwrap();
        create_app(config, pool)
    }

    #[tokio::test]
    async fn test_liveness_probe() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_group_routes_require_identity_headers() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/groups/00000000-0000-0000-0000-000000000000/lock")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
