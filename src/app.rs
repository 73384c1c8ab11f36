use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers::{PageLimits, crud_router, health_handler};
use crate::resources::product::ProductDto;
use crate::routes;
use crate::service::CrudService;
use crate::state::AppState;

/// Assemble the HTTP surface: health, products, and the OpenAPI docs.
pub fn build_router(state: AppState, products: Arc<dyn CrudService<ProductDto>>) -> Router {
    let limits = PageLimits {
        default_size: state.config.default_page_size,
        max_size: state.config.max_page_size,
    };

    Router::new()
        .route(routes::HEALTH, get(health_handler))
        .with_state(state)
        .nest(routes::PRODUCTS, crud_router(products, limits))
        .merge(SwaggerUi::new(routes::SWAGGER_UI).url(routes::OPENAPI_JSON, ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
