use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::{AppState, Error};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::message as MessageApi;
use domain::{messages::Model, Id};
use service::config::ApiVersion;

use log::*;

/// POST send a new direct Message.
///
/// The message row commits before the live push is even attempted; an
/// offline recipient finds it in the conversation on their next fetch.
#[utoipa::path(
    post,
    path = "/messages",
    params(ApiVersion),
    request_body = entity::messages::Model,
    responses(
        (status = 201, description = "Successfully Sent a New Message", body = [entity::messages::Model]),
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
    Json(message_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Send a New Message to: {}", message_model.recipient_id);

    let message = MessageApi::send(
        app_state.db_conn_ref(),
        app_state.event_bus.as_ref(),
        message_model,
        user.id,
    )
    .await?;

    debug!("New Message: {message:?}");

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), message)))
}

/// GET the conversation between the caller and another user
#[utoipa::path(
    get,
    path = "/messages/{user_id}",
    params(
        ApiVersion,
        ("user_id" = Id, Path, description = "The other participant in the conversation"),
    ),
    responses(
        (status = 200, description = "Successfully retrieved the conversation", body = [entity::messages::Model]),
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
    Path(other_user_id): Path<Id>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET conversation between {} and {other_user_id}", user.id);

    let messages =
        MessageApi::find_conversation(app_state.db_conn_ref(), user.id, other_user_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), messages)))
}
