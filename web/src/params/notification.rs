use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct IndexParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub is_read: Option<bool>,
}
