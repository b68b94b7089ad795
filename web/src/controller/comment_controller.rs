use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::comment::IndexParams;
use crate::{AppState, Error};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::comment as CommentApi;
use domain::{comments::Model, Id};
use service::config::ApiVersion;

use log::*;

/// POST create a new Comment.
///
/// The comment is durably created and the response returned on that basis
/// alone; notification and live delivery run behind the event bus and can
/// never fail this request.
#[utoipa::path(
    post,
    path = "/comments",
    params(ApiVersion),
    request_body = entity::comments::Model,
    responses(
        (status = 201, description = "Successfully Created a New Comment", body = [entity::comments::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Unprocessable Entity")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn create(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(comment_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a New Comment from: {comment_model:?}");

    let comment = CommentApi::create(
        app_state.db_conn_ref(),
        app_state.event_bus.as_ref(),
        comment_model,
        user.id,
    )
    .await?;

    debug!("New Comment: {comment:?}");

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), comment)))
}

/// GET all Comments on a Post
#[utoipa::path(
    get,
    path = "/comments",
    params(
        ApiVersion,
        ("post_id" = Id, Query, description = "Filter by post_id")
    ),
    responses(
        (status = 200, description = "Successfully retrieved all Comments of a Post", body = [entity::comments::Model]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn index(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(_user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET all Comments");
    debug!("Filter Params: {params:?}");

    let comments = CommentApi::find_by_post(app_state.db_conn_ref(), params.post_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), comments)))
}
