use crate::{controller::health_check_controller, middleware::auth::require_auth, AppState};
use axum::{
    middleware::from_fn,
    routing::{delete, get, post, put},
    Router,
};

use crate::controller::{
    comment_controller, message_controller, notification_controller, post_controller,
    subtable_controller, user_controller, user_session_controller, vote_controller,
};
use crate::ws::handler::ws_handler;

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Agora Platform API"
        ),
        paths(
            comment_controller::create,
            comment_controller::index,
            health_check_controller::health_check,
            message_controller::create,
            message_controller::index,
            notification_controller::index,
            notification_controller::unread_count,
            notification_controller::mark_read,
            post_controller::create,
            post_controller::read,
            post_controller::index,
            subtable_controller::create,
            subtable_controller::read,
            subtable_controller::index,
            user_controller::create,
            user_session_controller::login,
            user_session_controller::delete,
            vote_controller::upsert,
        ),
        components(
            schemas(
                domain::comments::Model,
                domain::messages::Model,
                domain::notifications::Model,
                domain::posts::Model,
                domain::subtables::Model,
                domain::users::Model,
                domain::votes::Model,
                domain::user::Credentials,
                notification_controller::NotificationPageResponse,
                notification_controller::UnreadCountResponse,
                crate::params::vote::VoteParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "agora_platform", description = "Agora discussion forum API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our cookie session based authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value returned from successful login via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(comment_routes(app_state.clone()))
        .merge(health_routes())
        .merge(message_routes(app_state.clone()))
        .merge(notification_routes(app_state.clone()))
        .merge(post_routes(app_state.clone()))
        .merge(subtable_routes(app_state.clone()))
        .merge(user_routes(app_state.clone()))
        .merge(user_session_routes(app_state.clone()))
        .merge(ws_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn comment_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/comments", post(comment_controller::create))
        .route("/comments", get(comment_controller::index))
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn message_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/messages", post(message_controller::create))
        .route("/messages/:user_id", get(message_controller::index))
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

fn notification_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/notifications", get(notification_controller::index))
        .route(
            "/notifications/unread_count",
            get(notification_controller::unread_count),
        )
        .route(
            "/notifications/:id/read",
            put(notification_controller::mark_read),
        )
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

fn post_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/posts", post(post_controller::create))
        .route("/posts/:id", get(post_controller::read))
        .route("/posts", get(post_controller::index))
        .route("/posts/:id/vote", put(vote_controller::upsert))
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

fn subtable_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/subtables", post(subtable_controller::create))
        .route("/subtables/:id", get(subtable_controller::read))
        .route("/subtables", get(subtable_controller::index))
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

fn user_routes(app_state: AppState) -> Router {
    // Signup is the one write that cannot require an existing session.
    Router::new()
        .route("/users", post(user_controller::create))
        .with_state(app_state)
}

fn user_session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/login", post(user_session_controller::login))
        .merge(
            Router::new()
                .route("/login", delete(user_session_controller::delete))
                .route_layer(from_fn(require_auth)),
        )
        .with_state(app_state)
}

fn ws_routes(app_state: AppState) -> Router {
    // Authentication happens inside the handler's extractor, before the
    // upgrade completes.
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
