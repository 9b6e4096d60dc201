use crate::{error::ErrorServer, summary, summary::dto::SummaryRequest};
use newsroom_core::assistant::dto::{Digest, RunStep};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(summary::handler::summarize),
    components(schemas(SummaryRequest, Digest, RunStep, ErrorServer))
)]
pub struct ApiDoc;
