//! Content type (structure) storage for the CMS.
//! Persistence, permission-filtered listing and cache upkeep live here.

pub mod access;
pub mod cache;
pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use access::license::LicenseLevel;
pub use access::permission::{
    AllowAllPermissions, PermissionChecker, PermissionLevel, SqlitePermissionChecker,
};
pub use cache::content_type_cache::{CacheStats, ContentTypeCache, InMemoryContentTypeCache};
pub use config::{ConfigError, FactoryConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use events::system_event::{
    EventError, LogEventSink, RecordingEventSink, SystemEvent, SystemEventSink, SystemEventType,
    Visibility,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::field::{Field, FieldId, FieldType};
pub use model::folder::{Folder, WorkflowScheme};
pub use model::structure::{
    Structure, StructureId, StructureType, StructureValidationError, SYSTEM_FOLDER, SYSTEM_HOST,
};
pub use model::user::User;
pub use repo::field_repo::{FieldRepository, SqliteFieldRepository};
pub use repo::structure_repo::{
    RepoError, RepoResult, SaveOutcome, SortDirection, SqliteStructureRepository,
    StructureFilter, StructureListQuery, StructureOrder, StructureRepository,
};
pub use service::pagination::PaginatedList;
pub use service::structure_service::{
    ServiceError, ServiceResult, StructureService, StructureUrlMap,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
