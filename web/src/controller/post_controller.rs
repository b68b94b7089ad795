use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::post::IndexParams;
use crate::{AppState, Error};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::post as PostApi;
use domain::{posts::Model, Id};
use service::config::ApiVersion;

use log::*;

/// POST create a new Post
#[utoipa::path(
    post,
    path = "/posts",
    params(ApiVersion),
    request_body = entity::posts::Model,
    responses(
        (status = 201, description = "Successfully Created a New Post", body = [entity::posts::Model]),
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
    Json(post_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a New Post from: {post_model:?}");

    let post = PostApi::create(app_state.db_conn_ref(), post_model, user.id).await?;

    debug!("New Post: {post:?}");

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), post)))
}

/// GET a particular Post specified by its id.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Post id to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved a specific Post by its id", body = [entity::posts::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn read(
    CompareApiVersion(_v): CompareApiVersion,
    State(app_state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET Post by id: {id}");

    let post = PostApi::find_by_id(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), post)))
}

/// GET all Posts in a Subtable
#[utoipa::path(
    get,
    path = "/posts",
    params(
        ApiVersion,
        ("subtable_id" = Id, Query, description = "Filter by subtable_id")
    ),
    responses(
        (status = 200, description = "Successfully retrieved all Posts of a Subtable", body = [entity::posts::Model]),
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
    debug!("GET all Posts");
    debug!("Filter Params: {params:?}");

    let posts = PostApi::find_by_subtable(app_state.db_conn_ref(), params.subtable_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), posts)))
}
