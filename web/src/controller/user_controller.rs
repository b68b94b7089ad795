use crate::controller::ApiResponse;
use crate::extractors::compare_api_version::CompareApiVersion;
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::user as UserApi;
use domain::users::Model;
use service::config::ApiVersion;

use log::*;

/// POST create a new User (signup). The only unauthenticated write in the
/// API; the password is hashed before it touches the database.
#[utoipa::path(
    post,
    path = "/users",
    params(ApiVersion),
    request_body = entity::users::Model,
    responses(
        (status = 201, description = "Successfully Created a New User", body = [entity::users::Model]),
        (status = 422, description = "Unprocessable Entity")
    )
)]
pub async fn create(
    CompareApiVersion(_v): CompareApiVersion,
    State(app_state): State<AppState>,
    Json(user_model): Json<Model>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST Create a New User with username: {}", user_model.username);

    let user = UserApi::create(app_state.db_conn_ref(), user_model).await?;

    Ok(Json(ApiResponse::new(StatusCode::CREATED.into(), user)))
}
