use axum::response::Json;
use utoipa::OpenApi;

use crate::handlers;
use common::models::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::metrics,
    ),
    components(schemas(HealthResponse)),
    tags(
        (name = "metrics", description = "Prometheus scrape endpoint"),
    ),
)]
struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
