use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct SummaryRequest {
    /// Topic to search the news for, e.g. `bitcoin`.
    pub topic: String,
}
