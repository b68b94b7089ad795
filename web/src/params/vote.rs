use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct VoteParams {
    /// +1 upvote, -1 downvote
    pub value: i16,
}
