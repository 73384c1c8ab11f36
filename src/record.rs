//! Contracts shared by every resource plugged into the CRUD layer.
//!
//! A resource is a DTO (the wire shape), an entity (the stored shape) and a
//! [`Mapper`] that converts between them field by field.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage-assigned identifier. `0` means "not yet created".
pub type RecordId = i64;

/// Sentinel for an identifier that has not been assigned.
pub const EMPTY_ID: RecordId = 0;

/// Soft-delete marker embedded in every entity.
///
/// `deleted_at` is `Some` exactly when `deleted` is true. Only
/// [`SoftDelete::mark`] ever sets either field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftDelete {
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDelete {
    /// Mark as deleted at `at`. A record that is already deleted keeps its
    /// first timestamp.
    pub fn mark(&mut self, at: DateTime<Utc>) {
        if !self.deleted {
            self.deleted = true;
            self.deleted_at = Some(at);
        }
    }
}

/// Minimal shape of a persisted record.
pub trait EntityRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> RecordId;
    fn set_id(&mut self, id: RecordId);
    fn soft_delete(&self) -> &SoftDelete;
    fn soft_delete_mut(&mut self) -> &mut SoftDelete;

    fn is_deleted(&self) -> bool {
        self.soft_delete().deleted
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.soft_delete().deleted_at
    }
}

/// Minimal shape of a wire DTO.
pub trait DataTransferObject: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> RecordId;
}

/// Explicit conversion between a DTO and its entity.
///
/// Conversions are fallible so a resource can reject values its storage
/// shape cannot hold. The service reports such failures as persistence
/// errors.
pub trait Mapper<T, E>: Send + Sync + 'static {
    /// Build an entity from a DTO. The soft-delete marker starts cleared.
    fn to_entity(&self, dto: T) -> anyhow::Result<E>;

    fn to_dto(&self, entity: E) -> anyhow::Result<T>;
}
