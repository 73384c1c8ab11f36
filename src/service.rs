//! Generic CRUD service.
//!
//! [`CrudService`] is the capability the HTTP controller depends on.
//! [`GenericService`] implements it for any DTO/entity pair by mapping
//! through a [`Mapper`] and delegating storage to a [`Repository`].

use async_trait::async_trait;
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::CrudError;
use crate::models::{PageRequest, PageResponse};
use crate::record::{DataTransferObject, EMPTY_ID, EntityRecord, Mapper, RecordId};
use crate::repository::Repository;

const SAVE_CONTEXT: &str = "An exception has occurred saving your entity";
const DELETE_CONTEXT: &str = "An exception has occurred deleting your entity";

#[async_trait]
pub trait CrudService<T: DataTransferObject>: Send + Sync {
    /// Persist a new record. Any id on the DTO is ignored.
    async fn create(&self, dto: T) -> Result<T, CrudError>;

    /// Overwrite an existing record with the DTO's fields.
    async fn update(&self, dto: T) -> Result<T, CrudError>;

    /// `Ok(None)` when nothing is stored under `id`. Soft-deleted records
    /// are still returned.
    async fn get_by_id(&self, id: RecordId) -> Result<Option<T>, CrudError>;

    /// One page of records that are not soft-deleted.
    async fn get_all(&self, request: PageRequest) -> Result<PageResponse<T>, CrudError>;

    async fn soft_delete(&self, id: RecordId) -> Result<(), CrudError>;

    async fn hard_delete(&self, id: RecordId) -> Result<(), CrudError>;
}

pub struct GenericService<T, E, M> {
    repository: Arc<dyn Repository<E>>,
    mapper: M,
    _dto: PhantomData<fn() -> T>,
}

impl<T, E, M> GenericService<T, E, M>
where
    T: DataTransferObject,
    E: EntityRecord,
    M: Mapper<T, E>,
{
    pub fn new(repository: Arc<dyn Repository<E>>, mapper: M) -> Self {
        Self {
            repository,
            mapper,
            _dto: PhantomData,
        }
    }

    async fn find(&self, id: RecordId, context: &'static str) -> Result<Option<E>, CrudError> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(|e| CrudError::persistence(context, e))
    }

    /// No record is ever stored under the empty id, so it resolves to
    /// `NotFound` here like any other missing id.
    async fn find_existing(&self, id: RecordId) -> Result<E, CrudError> {
        self.find(id, "An exception has occurred finding your entity")
            .await?
            .ok_or(CrudError::NotFound(id))
    }

    /// Store `entity` and map the stored row back to a DTO.
    async fn persist(&self, entity: E) -> Result<T, CrudError> {
        let saved = self
            .repository
            .save(entity)
            .await
            .map_err(|e| CrudError::persistence(SAVE_CONTEXT, e))?;

        self.mapper
            .to_dto(saved)
            .map_err(|e| CrudError::persistence(SAVE_CONTEXT, e))
    }
}

fn require_id(id: RecordId) -> Result<(), CrudError> {
    if id == EMPTY_ID {
        return Err(CrudError::validation("Entity ID can not be empty!"));
    }
    Ok(())
}

#[async_trait]
impl<T, E, M> CrudService<T> for GenericService<T, E, M>
where
    T: DataTransferObject,
    E: EntityRecord,
    M: Mapper<T, E>,
{
    async fn create(&self, dto: T) -> Result<T, CrudError> {
        tracing::debug!("Creating entity");

        let mut entity = self
            .mapper
            .to_entity(dto)
            .map_err(|e| CrudError::persistence(SAVE_CONTEXT, e))?;
        entity.set_id(EMPTY_ID);

        let created = self.persist(entity).await?;
        tracing::info!("Created entity with id: {}", created.id());
        Ok(created)
    }

    async fn update(&self, dto: T) -> Result<T, CrudError> {
        let id = dto.id();
        require_id(id)?;
        tracing::debug!("Updating entity with id: {}", id);

        let existing = self.find_existing(id).await?;

        let mut entity = self
            .mapper
            .to_entity(dto)
            .map_err(|e| CrudError::persistence(SAVE_CONTEXT, e))?;
        entity.set_id(id);
        // The soft-delete marker is not part of the DTO; only soft_delete changes it.
        *entity.soft_delete_mut() = *existing.soft_delete();

        let updated = self.persist(entity).await?;
        tracing::info!("Updated entity with id: {}", id);
        Ok(updated)
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<T>, CrudError> {
        require_id(id)?;
        tracing::debug!("Fetching entity with id: {}", id);

        const CONTEXT: &str = "An exception has occurred finding your entity by id";
        match self.find(id, CONTEXT).await? {
            Some(entity) => self
                .mapper
                .to_dto(entity)
                .map(Some)
                .map_err(|e| CrudError::persistence(CONTEXT, e)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, request: PageRequest) -> Result<PageResponse<T>, CrudError> {
        tracing::debug!(
            "Listing entities (page: {}, size: {})",
            request.page(),
            request.size()
        );

        const CONTEXT: &str = "An exception has occurred finding your entities";
        let page = self
            .repository
            .find_all(&request)
            .await
            .map_err(|e| CrudError::persistence(CONTEXT, e))?;

        PageResponse::from_page(page, |entity| self.mapper.to_dto(entity))
            .map_err(|e| CrudError::persistence(CONTEXT, e))
    }

    async fn soft_delete(&self, id: RecordId) -> Result<(), CrudError> {
        let mut entity = self.find_existing(id).await?;

        entity.soft_delete_mut().mark(Utc::now());
        self.repository
            .save(entity)
            .await
            .map_err(|e| CrudError::persistence(DELETE_CONTEXT, e))?;

        tracing::info!("Soft-deleted entity with id: {}", id);
        Ok(())
    }

    async fn hard_delete(&self, id: RecordId) -> Result<(), CrudError> {
        self.find_existing(id).await?;

        self.repository
            .delete(id)
            .await
            .map_err(|e| CrudError::persistence(DELETE_CONTEXT, e))?;

        tracing::info!("Permanently deleted entity with id: {}", id);
        Ok(())
    }
}
