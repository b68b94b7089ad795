use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::vote::VoteParams;
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::vote as VoteApi;
use domain::Id;
use service::config::ApiVersion;

use log::*;

/// PUT cast or change the caller's vote on a Post
#[utoipa::path(
    put,
    path = "/posts/{id}/vote",
    params(
        ApiVersion,
        ("id" = Id, Path, description = "Id of the post being voted on"),
    ),
    request_body = crate::params::vote::VoteParams,
    responses(
        (status = 200, description = "Successfully Cast a Vote", body = [entity::votes::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Unprocessable Entity")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn upsert(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(post_id): Path<Id>,
    Json(params): Json<VoteParams>,
) -> Result<impl IntoResponse, Error> {
    debug!("PUT Vote on Post {post_id} with value {}", params.value);

    let vote = VoteApi::cast(
        app_state.db_conn_ref(),
        app_state.event_bus.as_ref(),
        user.id,
        post_id,
        params.value,
    )
    .await?;

    debug!("Vote cast: {vote:?}");

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), vote)))
}
