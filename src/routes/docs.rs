use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Mount point of the interactive API explorer.
const SWAGGER_UI_PATH: &str = "/docs";
/// Where the generated OpenAPI document itself is served.
const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Serve the API explorer backed by the generated OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    let explorer: Router<SharedState> = SwaggerUi::new(SWAGGER_UI_PATH)
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .into();

    explorer.with_state(state)
}
