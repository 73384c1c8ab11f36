use serde::{Deserialize, Serialize};

use crate::error::CrudError;

/// A validated page spec: zero-based `page`, `size` rows per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Validate a page spec. `size` must be in `1..=max_size`.
    pub fn new(page: u32, size: u32, max_size: u32) -> Result<Self, CrudError> {
        if size == 0 {
            return Err(CrudError::validation("Page size must be at least 1"));
        }
        if size > max_size {
            return Err(CrudError::validation(format!(
                "Page size must not exceed {}, got {}",
                max_size, size
            )));
        }
        Ok(Self { page, size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// One page of rows as returned by a repository
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub content: Vec<E>,
    pub request: PageRequest,
    pub total_elements: u64,
}

impl<E> Page<E> {
    pub fn total_pages(&self) -> u64 {
        self.total_elements.div_ceil(u64::from(self.request.size()))
    }
}

/// Response type for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    /// Zero-based index of this page
    pub page: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Wrap a repository page, converting each row.
    pub fn from_page<E, F, Err>(page: Page<E>, convert: F) -> Result<Self, Err>
    where
        F: FnMut(E) -> Result<T, Err>,
    {
        let total_pages = page.total_pages();
        let content = page
            .content
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse {
            content,
            page: page.request.page(),
            total_elements: page.total_elements,
            total_pages,
        })
    }
}

/// Query parameters for list endpoints
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Zero-based page index (default 0)
    pub page: Option<u32>,
    /// Rows per page (default from configuration)
    pub size: Option<u32>,
}

/// Query parameters for delete endpoints
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    /// Mark as deleted instead of removing the row (default true)
    pub soft_delete: Option<bool>,
}

/// Response type for successful DELETE operations
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub status: String,
    pub deleted: String,
}

impl DeleteResponse {
    pub fn deleted(id: i64) -> Self {
        DeleteResponse {
            status: "deleted".to_string(),
            deleted: id.to_string(),
        }
    }
}
