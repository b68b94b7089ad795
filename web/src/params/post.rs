use domain::Id;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct IndexParams {
    pub subtable_id: Id,
}
