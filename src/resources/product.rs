//! Example resource wired into the service at `/products`.

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::record::{DataTransferObject, EntityRecord, Mapper, RecordId, SoftDelete};
use crate::service::{CrudService, GenericService};
use crate::state::Backend;

pub const TABLE: &str = "products";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    /// Assigned on create; 0 or absent for new products
    #[serde(default)]
    #[schema(value_type = i64)]
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
}

impl DataTransferObject for ProductDto {
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    #[serde(flatten)]
    pub soft_delete: SoftDelete,
}

impl EntityRecord for ProductEntity {
    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn soft_delete(&self) -> &SoftDelete {
        &self.soft_delete
    }

    fn soft_delete_mut(&mut self) -> &mut SoftDelete {
        &mut self.soft_delete
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductMapper;

impl Mapper<ProductDto, ProductEntity> for ProductMapper {
    fn to_entity(&self, dto: ProductDto) -> Result<ProductEntity> {
        ensure!(dto.price.is_finite(), "price must be a finite number");

        Ok(ProductEntity {
            id: dto.id,
            name: dto.name,
            description: dto.description,
            price: dto.price,
            stock: i64::from(dto.stock),
            soft_delete: SoftDelete::default(),
        })
    }

    fn to_dto(&self, entity: ProductEntity) -> Result<ProductDto> {
        let stock = u32::try_from(entity.stock)
            .with_context(|| format!("stored stock {} is out of range", entity.stock))?;

        Ok(ProductDto {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            price: entity.price,
            stock,
        })
    }
}

/// Build the product service on top of the configured storage.
pub async fn service(backend: &Backend) -> Result<Arc<dyn CrudService<ProductDto>>> {
    let repository = backend.repository::<ProductEntity>(TABLE).await?;
    Ok(Arc::new(GenericService::<ProductDto, ProductEntity, ProductMapper>::new(
        repository,
        ProductMapper,
    )))
}
