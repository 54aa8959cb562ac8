//! Structure use-case service.
//!
//! # Responsibility
//! - Provide the content type factory: lookups, permission-filtered and
//!   license-filtered listings, pagination, and writes.
//! - Fan structure writes out to the cache and system-event collaborators.
//!
//! # Invariants
//! - License-hidden types never reach user-facing listings or counts.
//! - Every successful create/update/delete through `save_structure` and
//!   `delete_structure*` pushes exactly one system event.
//! - Cached per-type lists holding a written structure are invalidated
//!   before the write returns.

use crate::access::permission::{PermissionChecker, PermissionLevel};
use crate::cache::content_type_cache::ContentTypeCache;
use crate::config::FactoryConfig;
use crate::db::DbError;
use crate::events::system_event::{EventError, SystemEvent, SystemEventSink, SystemEventType};
use crate::model::field::{Field, FieldType};
use crate::model::folder::Folder;
use crate::model::structure::{
    Structure, StructureId, StructureType, SYSTEM_FOLDER, SYSTEM_HOST,
};
use crate::model::user::User;
use crate::repo::field_repo::{FieldRepository, SqliteFieldRepository};
use crate::repo::structure_repo::{
    RepoError, SaveOutcome, SqliteStructureRepository, StructureFilter,
    StructureListQuery, StructureOrder, StructureRepository,
};
use crate::service::default_structures;
use crate::service::pagination::{scan_page, slice_page, PageWindow, PaginatedList};
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from structure service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Target structure does not exist.
    NotFound(StructureId),
    /// Repository-level failure.
    Repo(RepoError),
    /// Permission lookup failure.
    Db(DbError),
    /// System event could not be delivered.
    Event(EventError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "structure not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Event(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Event(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<EventError> for ServiceError {
    fn from(value: EventError) -> Self {
        Self::Event(value)
    }
}

/// URL-map pattern bound to one structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureUrlMap {
    pub inode: StructureId,
    pub url_map_pattern: String,
}

/// Content type factory facade.
pub struct StructureService<R, F, P>
where
    R: StructureRepository,
    F: FieldRepository,
    P: PermissionChecker,
{
    structures: R,
    fields: F,
    permissions: P,
    cache: Arc<dyn ContentTypeCache>,
    events: Arc<dyn SystemEventSink>,
    config: FactoryConfig,
}

impl<'conn, P: PermissionChecker>
    StructureService<SqliteStructureRepository<'conn>, SqliteFieldRepository<'conn>, P>
{
    /// Wires SQLite repositories over one migrated connection.
    pub fn sqlite(
        conn: &'conn Connection,
        permissions: P,
        cache: Arc<dyn ContentTypeCache>,
        events: Arc<dyn SystemEventSink>,
        config: FactoryConfig,
    ) -> Self {
        Self::new(
            SqliteStructureRepository::new(conn),
            SqliteFieldRepository::new(conn),
            permissions,
            cache,
            events,
            config,
        )
    }
}

impl<R, F, P> StructureService<R, F, P>
where
    R: StructureRepository,
    F: FieldRepository,
    P: PermissionChecker,
{
    pub fn new(
        structures: R,
        fields: F,
        permissions: P,
        cache: Arc<dyn ContentTypeCache>,
        events: Arc<dyn SystemEventSink>,
        config: FactoryConfig,
    ) -> Self {
        Self {
            structures,
            fields,
            permissions,
            cache,
            events,
            config,
        }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    pub fn structure_by_inode(&self, id: StructureId) -> ServiceResult<Option<Structure>> {
        Ok(self.structures.get_by_inode(id)?)
    }

    /// Loads a structure together with its fields.
    pub fn structure_with_fields(&self, id: StructureId) -> ServiceResult<Option<Structure>> {
        let Some(mut structure) = self.structures.get_by_inode(id)? else {
            return Ok(None);
        };
        structure.fields = self.fields.fields_for_structure(id)?;
        Ok(Some(structure))
    }

    /// Exact-name lookup.
    pub fn structure_by_type_name(&self, name: &str) -> ServiceResult<Option<Structure>> {
        Ok(self.structures.get_by_name(name)?)
    }

    /// Case-insensitive variable-name lookup; blank input finds nothing.
    pub fn structure_by_velocity_var_name(
        &self,
        velocity_var_name: &str,
    ) -> ServiceResult<Option<Structure>> {
        Ok(self.structures.get_by_velocity_var_name(velocity_var_name)?)
    }

    pub fn default_structure(&self) -> ServiceResult<Option<Structure>> {
        Ok(self.structures.get_default()?)
    }

    pub fn all_structure_names(&self) -> ServiceResult<Vec<String>> {
        Ok(self
            .all_by_name()?
            .into_iter()
            .map(|structure| structure.name)
            .collect())
    }

    pub fn all_velocity_var_names(&self) -> ServiceResult<Vec<String>> {
        Ok(self
            .all_by_name()?
            .into_iter()
            .map(|structure| structure.velocity_var_name)
            .collect())
    }

    pub fn url_map_patterns(&self) -> ServiceResult<Vec<StructureUrlMap>> {
        Ok(self
            .structures
            .url_map_patterns()?
            .into_iter()
            .map(|(inode, url_map_pattern)| StructureUrlMap {
                inode,
                url_map_pattern,
            })
            .collect())
    }

    /// Lists every structure the license exposes, by type then name.
    ///
    /// With `allowed_only`, keeps READ-permitted, non-system structures.
    pub fn structures_for_user(
        &self,
        user: Option<&User>,
        respect_frontend_roles: bool,
        allowed_only: bool,
    ) -> ServiceResult<Vec<Structure>> {
        self.structures_for_user_with(
            user,
            respect_frontend_roles,
            allowed_only,
            &StructureListQuery::ordered(StructureOrder::TypeThenUpperName),
        )
    }

    pub fn structures_for_user_with(
        &self,
        user: Option<&User>,
        respect_frontend_roles: bool,
        allowed_only: bool,
        query: &StructureListQuery,
    ) -> ServiceResult<Vec<Structure>> {
        let mut query = query.clone();
        query.filter = query
            .filter
            .excluding(self.config.license_level.hidden_for_users());

        let all = self.structures.list(&query)?;
        if !allowed_only {
            return Ok(all);
        }
        self.retain_permitted(
            all,
            PermissionLevel::Read,
            user,
            respect_frontend_roles,
            true,
        )
    }

    /// Plain listing. Under the lowest license tier an unfiltered query
    /// hides forms.
    pub fn structures(&self, query: &StructureListQuery) -> ServiceResult<Vec<Structure>> {
        let hidden = self.config.license_level.hidden_for_listing();
        if !hidden.is_empty() && query.filter.is_empty() {
            let mut query = query.clone();
            query.filter = query.filter.excluding(hidden);
            return Ok(self.structures.list(&query)?);
        }
        Ok(self.structures.list(query)?)
    }

    /// Read-through cached listing of one type by integer code.
    ///
    /// Non-positive or unknown codes yield an empty list.
    pub fn all_structures_by_type_code(&self, code: i64) -> ServiceResult<Vec<Structure>> {
        if code <= 0 {
            return Ok(Vec::new());
        }
        match StructureType::from_code(code) {
            Some(structure_type) => self.all_structures_by_type(structure_type),
            None => Ok(Vec::new()),
        }
    }

    pub fn all_structures_by_type(
        &self,
        structure_type: StructureType,
    ) -> ServiceResult<Vec<Structure>> {
        if let Some(cached) = self.cache.structures_by_type(structure_type) {
            return Ok(cached);
        }

        let structures = self.structures.list(&StructureListQuery {
            filter: StructureFilter::of_type(structure_type),
            ..StructureListQuery::default()
        })?;
        self.cache
            .add_structures_by_type(structure_type, structures.clone());
        Ok(structures)
    }

    /// Pages through READ-permitted structures in batches.
    ///
    /// `query.limit` of `None` or `Some(0)` returns every permitted row from
    /// `query.offset`. Frontend roles are not considered.
    pub fn structures_by_user(
        &self,
        user: Option<&User>,
        query: &StructureListQuery,
    ) -> ServiceResult<PaginatedList<Structure>> {
        let window = PageWindow {
            batch_size: self.config.batch_size,
            count_window: self.config.count_window,
            limit: query.limit.unwrap_or(0),
            offset: query.offset,
        };

        let result = scan_page(
            window,
            |offset, limit| -> ServiceResult<Vec<Structure>> {
                Ok(self.structures.list(&StructureListQuery {
                    filter: query.filter.clone(),
                    order: query.order,
                    direction: query.direction,
                    limit: Some(limit),
                    offset,
                })?)
            },
            |batch| Ok(self.permissions.filter_readable(batch, user, false)?),
        );

        match result {
            Ok(page) => Ok(page),
            Err(err) => {
                warn!(
                    "event=structures_by_user module=service status=error user={} error={}",
                    user.map_or("anonymous", |user| user.user_id.as_str()),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn structures_with_write_permissions(
        &self,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> ServiceResult<Vec<Structure>> {
        let all = self.all_by_name()?;
        self.retain_permitted(
            all,
            PermissionLevel::Write,
            user,
            respect_frontend_roles,
            false,
        )
    }

    pub fn structures_with_read_permissions(
        &self,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> ServiceResult<Vec<Structure>> {
        let all = self.all_by_name()?;
        self.retain_permitted(
            all,
            PermissionLevel::Read,
            user,
            respect_frontend_roles,
            false,
        )
    }

    pub fn no_system_structures_with_read_permissions(
        &self,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> ServiceResult<Vec<Structure>> {
        let all = self
            .structures
            .list(&StructureListQuery::ordered(StructureOrder::TypeThenUpperName))?;
        self.retain_permitted(
            all,
            PermissionLevel::Read,
            user,
            respect_frontend_roles,
            true,
        )
    }

    pub fn structures_under_host(
        &self,
        host_id: &str,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> ServiceResult<Vec<Structure>> {
        let all = self.structures.list_under_host(host_id)?;
        self.retain_permitted(
            all,
            PermissionLevel::Read,
            user,
            respect_frontend_roles,
            false,
        )
    }

    pub fn structures_by_workflow_scheme(
        &self,
        scheme_id: &str,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> ServiceResult<Vec<Structure>> {
        let all = self.structures.list_by_workflow_scheme(scheme_id)?;
        self.retain_permitted(
            all,
            PermissionLevel::Read,
            user,
            respect_frontend_roles,
            false,
        )
    }

    /// Counts structures matching `filter`, minus license-hidden types.
    pub fn structures_count(&self, filter: &StructureFilter) -> ServiceResult<u64> {
        let filter = filter
            .clone()
            .excluding(self.config.license_level.hidden_for_users());
        Ok(self.structures.count(&filter)?)
    }

    /// Name search over READ-permitted structures, optionally of one type.
    ///
    /// `limit` of `0` returns every match from `offset`.
    pub fn find_structures_user_can_use(
        &self,
        user: Option<&User>,
        name_query: &str,
        structure_type: Option<StructureType>,
        offset: u32,
        limit: u32,
    ) -> ServiceResult<Vec<Structure>> {
        let filter = StructureFilter {
            types: structure_type.into_iter().collect(),
            name_like: Some(name_query.to_string()),
            ..StructureFilter::default()
        };
        let all = self.structures.list(&StructureListQuery {
            filter,
            ..StructureListQuery::default()
        })?;
        let permitted = self.retain_permitted(all, PermissionLevel::Read, user, false, false)?;
        Ok(slice_page(permitted, offset, limit, u32::MAX).into_items())
    }

    pub fn totals(&self, structure: &Structure, field_type: FieldType) -> ServiceResult<usize> {
        Ok(self
            .fields
            .fields_for_structure(structure.inode)?
            .iter()
            .filter(|field| field.field_type == field_type)
            .count())
    }

    /// Date plus date-time fields.
    pub fn total_dates(&self, structure: &Structure) -> ServiceResult<usize> {
        Ok(self.totals(structure, FieldType::Date)? + self.totals(structure, FieldType::DateTime)?)
    }

    pub fn total_images(&self, structure: &Structure) -> ServiceResult<usize> {
        self.totals(structure, FieldType::Image)
    }

    pub fn total_files(&self, structure: &Structure) -> ServiceResult<usize> {
        self.totals(structure, FieldType::File)
    }

    pub fn total_text_areas(&self, structure: &Structure) -> ServiceResult<usize> {
        self.totals(structure, FieldType::TextArea)
    }

    pub fn total_wysiwyg(&self, structure: &Structure) -> ServiceResult<usize> {
        self.totals(structure, FieldType::Wysiwyg)
    }

    pub fn tag_fields(&self, structure_inode: StructureId) -> ServiceResult<Vec<Field>> {
        Ok(self
            .fields
            .fields_for_structure(structure_inode)?
            .into_iter()
            .filter(|field| field.field_type == FieldType::Tag)
            .collect())
    }

    /// Image fields named in `parameter_names` whose paired value is set.
    pub fn image_fields_with_values(
        &self,
        structure: &Structure,
        parameter_names: &[String],
        values: &[Vec<String>],
    ) -> ServiceResult<Vec<Field>> {
        self.fields_with_values(structure, FieldType::Image, parameter_names, values)
    }

    /// File fields named in `parameter_names` whose paired value is set.
    pub fn file_fields_with_values(
        &self,
        structure: &Structure,
        parameter_names: &[String],
        values: &[Vec<String>],
    ) -> ServiceResult<Vec<Field>> {
        self.fields_with_values(structure, FieldType::File, parameter_names, values)
    }

    pub fn save_field(&self, field: &Field) -> ServiceResult<()> {
        self.fields.save_field(field)?;
        Ok(())
    }

    /// Normalizes, persists, and announces a structure.
    pub fn save_structure(&self, structure: &mut Structure) -> ServiceResult<SaveOutcome> {
        prepare_for_save(structure);
        let outcome = self.structures.save(structure)?;
        self.announce_save(structure, outcome)?;
        Ok(outcome)
    }

    /// Inserts the structure under `existing_id`, e.g. for imports.
    ///
    /// No system event is pushed.
    pub fn save_structure_with_id(
        &self,
        structure: &mut Structure,
        existing_id: StructureId,
    ) -> ServiceResult<()> {
        prepare_for_save(structure);
        structure.inode = existing_id;
        self.structures.save_with_id(structure, existing_id)?;
        self.cache.remove(structure);
        info!(
            "event=structure_save_with_id module=service status=ok inode={}",
            existing_id
        );
        Ok(())
    }

    pub fn delete_structure(&self, id: StructureId) -> ServiceResult<()> {
        let structure = self
            .structures
            .get_by_inode(id)?
            .ok_or(ServiceError::NotFound(id))?;
        self.delete_structure_record(&structure)
    }

    pub fn delete_structure_record(&self, structure: &Structure) -> ServiceResult<()> {
        self.structures.delete_workflow_links(structure.inode)?;
        self.structures.delete(structure.inode)?;

        if structure.url_map_pattern.is_some() {
            self.cache.clear_url_map_patterns();
        }
        self.cache.remove(structure);
        self.events.push(SystemEvent::for_structure(
            SystemEventType::DeleteBaseContentType,
            structure,
        ))?;

        info!(
            "event=structure_delete module=service status=ok inode={}",
            structure.inode
        );
        Ok(())
    }

    /// Clears the default flag on the current default structure, if any.
    pub fn disable_default(&self) -> ServiceResult<()> {
        if let Some(mut structure) = self.structures.get_default()? {
            structure.default_structure = false;
            self.save_structure(&mut structure)?;
        }
        Ok(())
    }

    /// Seeds "Web Page Content" and "News Item" when no default exists.
    ///
    /// Structures and fields commit together; events follow the commit.
    /// Returns `false` when a default structure was already present.
    pub fn create_default_structures(&self) -> ServiceResult<bool> {
        if self.structures.get_default()?.is_some() {
            return Ok(false);
        }

        info!("event=default_structures module=service status=start");

        let mut web_page = default_structures::web_page_content();
        prepare_for_save(&mut web_page);
        let web_page_fields = default_structures::web_page_content_fields(web_page.inode);
        let mut seeds = vec![(web_page, web_page_fields)];

        let mut news = default_structures::news_item();
        if self
            .structures
            .get_by_velocity_var_name(&news.velocity_var_name)?
            .is_none()
        {
            prepare_for_save(&mut news);
            let news_fields = default_structures::news_item_fields(news.inode);
            seeds.push((news, news_fields));
        }

        let outcomes = self.structures.save_all_with_fields(&seeds)?;
        for ((structure, _), outcome) in seeds.iter().zip(outcomes) {
            self.announce_save(structure, outcome)?;
        }

        info!(
            "event=default_structures module=service status=ok seeded={}",
            seeds.len()
        );
        Ok(true)
    }

    /// Moves structures out of `folder` onto its host.
    ///
    /// Returns the number of structures moved.
    pub fn update_folder_references(&self, folder: &Folder) -> ServiceResult<usize> {
        let host = folder.host_id.trim();
        let target_host = if host.is_empty() || host == SYSTEM_HOST {
            SYSTEM_HOST
        } else {
            host
        };

        let structures = self.structures.list_by_folder(&folder.inode)?;
        let moved = structures.len();
        for mut structure in structures {
            structure.host = target_host.to_string();
            structure.folder = SYSTEM_FOLDER.to_string();
            self.structures.save(&structure)?;
            self.cache.remove(&structure);
            self.permissions.reset_permission_references(&structure)?;
        }

        info!(
            "event=folder_references module=service status=ok folder={} moved={moved}",
            folder.inode
        );
        Ok(moved)
    }

    /// Repoints folders defaulting to `structure` at the default file asset
    /// structure. Returns the number of folders changed.
    pub fn update_folder_file_asset_references(&self, structure: &Structure) -> ServiceResult<usize> {
        let Some(default_file_asset) = self
            .structures
            .get_by_velocity_var_name(&self.config.default_file_asset_var)?
        else {
            return Ok(0);
        };
        if default_file_asset.inode == structure.inode {
            return Ok(0);
        }
        Ok(self
            .structures
            .reassign_folder_default_file_type(structure.inode, default_file_asset.inode)?)
    }

    fn announce_save(&self, structure: &Structure, outcome: SaveOutcome) -> ServiceResult<()> {
        if structure.url_map_pattern.is_some() {
            self.cache.clear_url_map_patterns();
        }
        self.cache.remove(structure);

        let event_type = match outcome {
            SaveOutcome::Created => SystemEventType::SaveBaseContentType,
            SaveOutcome::Updated => SystemEventType::UpdateBaseContentType,
        };
        self.events
            .push(SystemEvent::for_structure(event_type, structure))?;

        info!(
            "event=structure_save module=service status=ok outcome={:?} inode={} type={:?}",
            outcome, structure.inode, structure.structure_type
        );
        Ok(())
    }

    fn all_by_name(&self) -> ServiceResult<Vec<Structure>> {
        Ok(self
            .structures
            .list(&StructureListQuery::ordered(StructureOrder::Name))?)
    }

    fn retain_permitted(
        &self,
        structures: Vec<Structure>,
        level: PermissionLevel,
        user: Option<&User>,
        respect_frontend_roles: bool,
        exclude_system: bool,
    ) -> ServiceResult<Vec<Structure>> {
        let mut kept = Vec::with_capacity(structures.len());
        for structure in structures {
            if exclude_system && structure.system {
                continue;
            }
            if self
                .permissions
                .has_permission(&structure, level, user, respect_frontend_roles)?
            {
                kept.push(structure);
            }
        }
        Ok(kept)
    }

    fn fields_with_values(
        &self,
        structure: &Structure,
        field_type: FieldType,
        parameter_names: &[String],
        values: &[Vec<String>],
    ) -> ServiceResult<Vec<Field>> {
        let fields = if structure.fields.is_empty() {
            self.fields.fields_for_structure(structure.inode)?
        } else {
            structure.fields.clone()
        };

        let mut matched = Vec::new();
        for (name, value) in parameter_names.iter().zip(values) {
            let Some(field) = fields.iter().find(|field| &field.velocity_var_name == name) else {
                continue;
            };
            if field.value_settable() && field.field_type == field_type && !value.is_empty() {
                matched.push(field.clone());
            }
        }
        Ok(matched)
    }
}

fn prepare_for_save(structure: &mut Structure) {
    structure.url_map_pattern = clean_url_map(structure.url_map_pattern.as_deref());
    let now = now_epoch_ms();
    structure.idate = now;
    structure.mod_date = now;
    fix_folder_host(structure);
}

/// Trims a URL-map pattern and forces a leading `/`; blank becomes `None`.
pub fn clean_url_map(url_map: Option<&str>) -> Option<String> {
    let trimmed = url_map?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}

fn fix_folder_host(structure: &mut Structure) {
    if structure.folder.trim().is_empty() {
        structure.folder = SYSTEM_FOLDER.to_string();
    }
    if structure.host.trim().is_empty() {
        structure.host = SYSTEM_HOST.to_string();
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
