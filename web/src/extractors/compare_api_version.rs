use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use service::config::ApiVersion;

/// Rejects requests whose `x-version` header is missing or names an API
/// version this build does not expose.
pub(crate) struct CompareApiVersion(pub ApiVersion);

#[async_trait]
impl<S> FromRequestParts<S> for CompareApiVersion
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(ApiVersion::field_name()).ok_or((
            StatusCode::BAD_REQUEST,
            format!("Missing {} header", ApiVersion::field_name()),
        ))?;

        let version_str = header.to_str().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid {} header", ApiVersion::field_name()),
            )
        })?;

        let supported = ApiVersion::versions()
            .into_iter()
            .find(|supported| *supported == version_str)
            .ok_or((
                StatusCode::NOT_ACCEPTABLE,
                format!("Unsupported API version: {version_str}"),
            ))?;

        Ok(CompareApiVersion(ApiVersion::new(supported)))
    }
}
