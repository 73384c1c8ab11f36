// Route path constants - single source of truth for all API paths

pub const HEALTH: &str = "/health";
pub const PRODUCTS: &str = "/products";
pub const PRODUCT_ITEM: &str = "/products/{id}";

// Relative to a resource's base path
pub const COLLECTION: &str = "/";
pub const ITEM: &str = "/{id}";

pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
pub const SWAGGER_UI: &str = "/swagger-ui";
