//! Generic CRUD controller.
//!
//! [`crud_router`] exposes any [`CrudService`] over HTTP. The returned router
//! uses relative paths and is meant to be nested under a resource's base path:
//!
//! - `POST /` create, body is the DTO
//! - `PUT /` update, body is the DTO (with its id)
//! - `GET /?page&size` one page of live records
//! - `GET /{id}` a single record, or `null`
//! - `DELETE /{id}?softDelete` soft (default) or hard delete

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::{ApiError, CrudError};
use crate::models::{DeleteQuery, DeleteResponse, ListQuery, PageRequest, PageResponse};
use crate::record::{DataTransferObject, RecordId};
use crate::routes;
use crate::service::CrudService;

/// Page size limits applied to list requests
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 10,
            max_size: 100,
        }
    }
}

/// State shared by the handlers of one resource
pub struct CrudState<T: DataTransferObject> {
    service: Arc<dyn CrudService<T>>,
    limits: PageLimits,
}

impl<T: DataTransferObject> Clone for CrudState<T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            limits: self.limits,
        }
    }
}

/// Build the CRUD routes for one resource.
pub fn crud_router<T: DataTransferObject>(
    service: Arc<dyn CrudService<T>>,
    limits: PageLimits,
) -> Router {
    Router::new()
        .route(
            routes::COLLECTION,
            post(create::<T>).put(update::<T>).get(list::<T>),
        )
        .route(routes::ITEM, get(get_by_id::<T>).delete(delete::<T>))
        .with_state(CrudState { service, limits })
}

/// Parse a request body into a DTO. An empty or `null` body is a
/// validation failure, malformed JSON is a body error.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CrudError::validation("Entity can not be empty!").into());
    }

    serde_json::from_slice::<Option<T>>(body)?
        .ok_or_else(|| CrudError::validation("Entity can not be empty!").into())
}

fn path_id(path: Result<Path<RecordId>, PathRejection>) -> Result<RecordId, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::InvalidQueryParam(rejection.body_text()))
}

/// POST / handler - Create a record
pub async fn create<T: DataTransferObject>(
    State(state): State<CrudState<T>>,
    body: Bytes,
) -> Result<Json<T>, ApiError> {
    let dto: T = parse_body(&body)?;
    let created = state.service.create(dto).await?;
    Ok(Json(created))
}

/// PUT / handler - Overwrite an existing record
pub async fn update<T: DataTransferObject>(
    State(state): State<CrudState<T>>,
    body: Bytes,
) -> Result<Json<T>, ApiError> {
    let dto: T = parse_body(&body)?;
    let updated = state.service.update(dto).await?;
    Ok(Json(updated))
}

/// GET / handler - List one page of records
pub async fn list<T: DataTransferObject>(
    State(state): State<CrudState<T>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PageResponse<T>>, ApiError> {
    let Query(query) =
        query.map_err(|rejection| ApiError::InvalidQueryParam(rejection.body_text()))?;

    let request = PageRequest::new(
        query.page.unwrap_or(0),
        query.size.unwrap_or(state.limits.default_size),
        state.limits.max_size,
    )?;

    let page = state.service.get_all(request).await?;

    tracing::info!(
        "Listed {} records (page: {}, total: {})",
        page.content.len(),
        page.page,
        page.total_elements
    );

    Ok(Json(page))
}

/// GET /{id} handler - Fetch one record, `null` when absent
pub async fn get_by_id<T: DataTransferObject>(
    State(state): State<CrudState<T>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> Result<Json<Option<T>>, ApiError> {
    let id = path_id(path)?;
    let found = state.service.get_by_id(id).await?;

    if found.is_none() {
        tracing::info!("Record not found with id: {}", id);
    }
    Ok(Json(found))
}

/// DELETE /{id} handler - Soft delete by default, hard delete with `softDelete=false`
pub async fn delete<T: DataTransferObject>(
    State(state): State<CrudState<T>>,
    path: Result<Path<RecordId>, PathRejection>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = path_id(path)?;
    let Query(query) =
        query.map_err(|rejection| ApiError::InvalidQueryParam(rejection.body_text()))?;

    if query.soft_delete.unwrap_or(true) {
        state.service.soft_delete(id).await?;
    } else {
        state.service.hard_delete(id).await?;
    }

    Ok(Json(DeleteResponse::deleted(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorResponse;
    use crate::repository::MemoryRepository;
    use crate::resources::product::{ProductDto, ProductEntity, ProductMapper};
    use crate::service::GenericService;
    use axum::{body::Body, http::Request, http::StatusCode, response::Response};
    use tower::ServiceExt;

    fn setup_test_app() -> Router {
        let repository: Arc<MemoryRepository<ProductEntity>> = Arc::new(MemoryRepository::new());
        let service: Arc<dyn CrudService<ProductDto>> = Arc::new(GenericService::<
            ProductDto,
            ProductEntity,
            ProductMapper,
        >::new(repository, ProductMapper));

        crud_router(service, PageLimits::default())
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn read_json<B: DeserializeOwned>(response: Response) -> B {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn create_product(app: &Router, name: &str) -> ProductDto {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/",
                serde_json::json!({"name": name, "price": 5.0, "stock": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        read_json(response).await
    }

    #[tokio::test]
    async fn test_create_endpoint_success() {
        let app = setup_test_app();

        let created = create_product(&app, "mug").await;

        assert!(created.id > 0);
        assert_eq!(created.name, "mug");
        assert_eq!(created.stock, 1);
    }

    #[tokio::test]
    async fn test_create_endpoint_empty_body() {
        let app = setup_test_app();

        let response = app.oneshot(empty_request("POST", "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "validation");
        assert!(error.message.contains("can not be empty"));
    }

    #[tokio::test]
    async fn test_create_endpoint_null_body() {
        let app = setup_test_app();

        let response = app
            .oneshot(json_request("POST", "/", serde_json::Value::Null))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "validation");
    }

    #[tokio::test]
    async fn test_create_endpoint_invalid_json() {
        let app = setup_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from("{invalid json}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "invalid_body");
    }

    #[tokio::test]
    async fn test_update_endpoint_success() {
        let app = setup_test_app();
        let created = create_product(&app, "mug").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/",
                serde_json::json!({
                    "id": created.id,
                    "name": "large mug",
                    "price": 7.5,
                    "stock": 4
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let updated: ProductDto = read_json(response).await;
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "large mug");

        let response = app
            .oneshot(empty_request("GET", &format!("/{}", created.id)))
            .await
            .unwrap();
        let fetched: Option<ProductDto> = read_json(response).await;
        assert_eq!(fetched, Some(updated));
    }

    #[tokio::test]
    async fn test_update_endpoint_not_found() {
        let app = setup_test_app();

        let response = app
            .oneshot(json_request(
                "PUT",
                "/",
                serde_json::json!({"id": 999, "name": "ghost", "price": 1.0}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "not_found");
        assert!(error.message.contains("999"));
    }

    #[tokio::test]
    async fn test_get_endpoint_missing_returns_null() {
        let app = setup_test_app();

        let response = app.oneshot(empty_request("GET", "/12345")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = read_json(response).await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_get_endpoint_zero_id_is_validation_error() {
        let app = setup_test_app();

        let response = app.oneshot(empty_request("GET", "/0")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "validation");
    }

    #[tokio::test]
    async fn test_get_endpoint_non_numeric_id() {
        let app = setup_test_app();

        let response = app.oneshot(empty_request("GET", "/abc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "invalid_query");
    }

    #[tokio::test]
    async fn test_list_endpoint_default_paging() {
        let app = setup_test_app();
        for i in 0..15 {
            create_product(&app, &format!("item-{}", i)).await;
        }

        let response = app.oneshot(empty_request("GET", "/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let page: PageResponse<ProductDto> = read_json(response).await;
        assert_eq!(page.content.len(), 10);
        assert_eq!(page.page, 0);
        assert_eq!(page.total_elements, 15);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_list_endpoint_second_page() {
        let app = setup_test_app();
        for i in 0..15 {
            create_product(&app, &format!("item-{}", i)).await;
        }

        let response = app
            .oneshot(empty_request("GET", "/?page=1&size=10"))
            .await
            .unwrap();

        let page: PageResponse<ProductDto> = read_json(response).await;
        assert_eq!(page.content.len(), 5);
        assert_eq!(page.page, 1);
        assert_eq!(page.content[0].name, "item-10");
    }

    #[tokio::test]
    async fn test_list_endpoint_invalid_size() {
        let app = setup_test_app();

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/?size=0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "validation");

        let response = app
            .oneshot(empty_request("GET", "/?size=lots"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "invalid_query");
    }

    #[tokio::test]
    async fn test_soft_delete_endpoint_hides_from_list() {
        let app = setup_test_app();
        let kept = create_product(&app, "kept").await;
        let removed = create_product(&app, "removed").await;

        let response = app
            .clone()
            .oneshot(empty_request("DELETE", &format!("/{}", removed.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: DeleteResponse = read_json(response).await;
        assert_eq!(body.status, "deleted");
        assert_eq!(body.deleted, removed.id.to_string());

        let response = app
            .clone()
            .oneshot(empty_request("GET", "/"))
            .await
            .unwrap();
        let page: PageResponse<ProductDto> = read_json(response).await;
        assert_eq!(page.content, vec![kept]);

        let response = app
            .oneshot(empty_request("GET", &format!("/{}", removed.id)))
            .await
            .unwrap();
        let fetched: Option<ProductDto> = read_json(response).await;
        assert_eq!(fetched, Some(removed));
    }

    #[tokio::test]
    async fn test_hard_delete_endpoint_removes_record() {
        let app = setup_test_app();
        let created = create_product(&app, "temp").await;

        let response = app
            .clone()
            .oneshot(empty_request(
                "DELETE",
                &format!("/{}?softDelete=false", created.id),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(empty_request("GET", &format!("/{}", created.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = read_json(response).await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_delete_endpoint_not_found() {
        let app = setup_test_app();

        let response = app
            .oneshot(empty_request("DELETE", "/4242?softDelete=false"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "not_found");
    }

    #[tokio::test]
    async fn test_delete_endpoint_zero_id_is_not_found() {
        let app = setup_test_app();

        for uri in ["/0", "/0?softDelete=false"] {
            let response = app
                .clone()
                .oneshot(empty_request("DELETE", uri))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "DELETE {}", uri);
            let error: ErrorResponse = read_json(response).await;
            assert_eq!(error.error, "not_found");
        }
    }

    #[tokio::test]
    async fn test_delete_endpoint_invalid_flag() {
        let app = setup_test_app();
        let created = create_product(&app, "temp").await;

        let response = app
            .oneshot(empty_request(
                "DELETE",
                &format!("/{}?softDelete=maybe", created.id),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = read_json(response).await;
        assert_eq!(error.error, "invalid_query");
    }
}
