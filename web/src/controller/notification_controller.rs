use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::notification::IndexParams;
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::notification as NotificationApi;
use domain::notification::NotificationFilters;
use domain::Id;
use serde::Serialize;
use service::config::ApiVersion;
use utoipa::ToSchema;

use log::*;

/// One page of the caller's notification list plus the total count for the
/// applied read-state filter.
#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationPageResponse {
    pub notifications: Vec<domain::notifications::Model>,
    pub total_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// GET the caller's notifications, newest first. The durable list is the
/// source of truth the client hydrates from on page load or reconnect;
/// the live channel replays nothing.
#[utoipa::path(
    get,
    path = "/notifications",
    params(
        ApiVersion,
        ("limit" = Option<u64>, Query, description = "Page size"),
        ("offset" = Option<u64>, Query, description = "Page offset"),
        ("is_read" = Option<bool>, Query, description = "Filter by read state")
    ),
    responses(
        (status = 200, description = "Successfully retrieved Notifications", body = NotificationPageResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn index(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Notifications for user {}", user.id);
    debug!("Filter Params: {params:?}");

    let page = NotificationApi::find_by_recipient(
        app_state.db_conn_ref(),
        user.id,
        NotificationFilters {
            is_read: params.is_read,
            limit: params.limit,
            offset: params.offset,
        },
    )
    .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        NotificationPageResponse {
            notifications: page.notifications,
            total_count: page.total_count,
        },
    )))
}

/// GET the caller's unread notification count
#[utoipa::path(
    get,
    path = "/notifications/unread_count",
    params(ApiVersion),
    responses(
        (status = 200, description = "Successfully retrieved the unread count", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn unread_count(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET unread Notification count for user {}", user.id);

    let count = NotificationApi::count_unread(app_state.db_conn_ref(), user.id).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        UnreadCountResponse { count },
    )))
}

/// PUT mark one of the caller's notifications as read
#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    params(
        ApiVersion,
        ("id" = Id, Path, description = "Id of the notification to mark read"),
    ),
    responses(
        (status = 200, description = "Successfully marked the Notification read", body = [entity::notifications::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn mark_read(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT mark Notification {id} read for user {}", user.id);

    let notification = NotificationApi::mark_read(app_state.db_conn_ref(), id, user.id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), notification)))
}
