use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::subtable as SubtableApi;
use domain::{subtables::Model, Id};
use service::config::ApiVersion;

use log::*;

/// POST create a new Subtable (community)
#[utoipa::path(
    post,
    path = "/subtables",
    params(ApiVersion),
    request_body = entity::subtables::Model,
    responses(
        (status = 201, description = "Successfully Created a New Subtable", body = [entity::subtables::Model]),
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
    Json(subtable_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a New Subtable from: {subtable_model:?}");

    let subtable = SubtableApi::create(app_state.db_conn_ref(), subtable_model, user.id).await?;

    debug!("New Subtable: {subtable:?}");

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), subtable)))
}

/// GET a particular Subtable specified by its id.
#[utoipa::path(
    get,
    path = "/subtables/{id}",
    params(
        ApiVersion,
        ("id" = String, Path, description = "Subtable id to retrieve")
    ),
    responses(
        (status = 200, description = "Successfully retrieved a specific Subtable by its id", body = [entity::subtables::Model]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subtable not found")
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
    debug!("GET Subtable by id: {id}");

    let subtable = SubtableApi::find_by_id(app_state.db_conn_ref(), id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), subtable)))
}

/// GET all Subtables
#[utoipa::path(
    get,
    path = "/subtables",
    params(ApiVersion),
    responses(
        (status = 200, description = "Successfully retrieved all Subtables", body = [entity::subtables::Model]),
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
) -> Result<impl IntoResponse, Error> {
    debug!("GET all Subtables");

    let subtables = SubtableApi::find_all(app_state.db_conn_ref()).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), subtables)))
}
