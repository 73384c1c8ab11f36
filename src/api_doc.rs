use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::DeleteResponse;
use crate::resources::product::ProductDto;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rust-spanner-crud API",
        version = "1.0.0",
        description = "Generic CRUD service with soft delete and pagination, backed by Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        products::create,
        products::update,
        products::list,
        products::get_by_id,
        products::delete
    ),
    components(
        schemas(
            ProductDto,
            DeleteResponse,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "products", description = "Product CRUD operations")
    )
)]
pub struct ApiDoc;

/// Path descriptions for the product routes.
///
/// The handlers are generic over the DTO type, so the concrete
/// `/products` contract is described here. These functions only carry
/// the `#[utoipa::path]` metadata and are never routed; the live handlers
/// are in `handlers::crud`.
#[allow(dead_code)]
mod products {
    use crate::error::ErrorResponse;
    use crate::models::{DeleteQuery, DeleteResponse, ListQuery, PageResponse};
    use crate::resources::product::ProductDto;
    use crate::routes;

    #[utoipa::path(
        post,
        path = routes::PRODUCTS,
        request_body = ProductDto,
        responses(
            (status = 200, description = "Product created", body = ProductDto),
            (status = 400, description = "Empty body or invalid JSON", body = ErrorResponse),
            (status = 500, description = "Mapping or database error", body = ErrorResponse)
        ),
        tag = "products"
    )]
    pub async fn create() {}

    #[utoipa::path(
        put,
        path = routes::PRODUCTS,
        request_body = ProductDto,
        responses(
            (status = 200, description = "Product overwritten", body = ProductDto),
            (status = 400, description = "Missing id, empty body or invalid JSON", body = ErrorResponse),
            (status = 404, description = "No product with this id", body = ErrorResponse),
            (status = 500, description = "Mapping or database error", body = ErrorResponse)
        ),
        tag = "products"
    )]
    pub async fn update() {}

    #[utoipa::path(
        get,
        path = routes::PRODUCTS,
        params(ListQuery),
        responses(
            (status = 200, description = "One page of products that are not soft-deleted", body = PageResponse<ProductDto>),
            (status = 400, description = "Invalid page or size", body = ErrorResponse),
            (status = 500, description = "Database error", body = ErrorResponse)
        ),
        tag = "products"
    )]
    pub async fn list() {}

    #[utoipa::path(
        get,
        path = routes::PRODUCT_ITEM,
        params(
            ("id" = i64, Path, description = "Product id")
        ),
        responses(
            (status = 200, description = "The product, or null when absent", body = Option<ProductDto>),
            (status = 400, description = "Id is zero or not a number", body = ErrorResponse),
            (status = 500, description = "Database error", body = ErrorResponse)
        ),
        tag = "products"
    )]
    pub async fn get_by_id() {}

    #[utoipa::path(
        delete,
        path = routes::PRODUCT_ITEM,
        params(
            ("id" = i64, Path, description = "Product id"),
            DeleteQuery
        ),
        responses(
            (status = 200, description = "Product deleted", body = DeleteResponse),
            (status = 400, description = "Invalid id or softDelete flag", body = ErrorResponse),
            (status = 404, description = "No product with this id", body = ErrorResponse),
            (status = 500, description = "Database error", body = ErrorResponse)
        ),
        tag = "products"
    )]
    pub async fn delete() {}
}
