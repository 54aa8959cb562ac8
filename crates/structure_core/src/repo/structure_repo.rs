//! Structure repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over `structures`.
//! - Own the folder and workflow-scheme rows that reference structures.
//!
//! # Invariants
//! - Write paths call `Structure::validate()` before SQL mutations.
//! - Every filter value is a bound parameter; no caller text is spliced
//!   into SQL.
//! - Listing order always ends with `inode ASC` so pages are stable.
//! - Name matching folds both sides with Unicode rules (`fold_case`), so
//!   connections must come from `db::open_db*`.

use crate::db::DbError;
use crate::model::field::Field;
use crate::model::folder::{Folder, WorkflowScheme};
use crate::model::structure::{Structure, StructureId, StructureType, StructureValidationError};
use crate::repo::field_repo::upsert_field;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const STRUCTURE_SELECT_SQL: &str = "SELECT
    inode,
    name,
    description,
    velocity_var_name,
    structure_type,
    default_structure,
    fixed,
    system,
    host,
    folder,
    url_map_pattern,
    idate,
    mod_date
FROM structures";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for structure persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(StructureValidationError),
    Db(DbError),
    NotFound(StructureId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "structure not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted structure data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<StructureValidationError> for RepoError {
    fn from(value: StructureValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Typed replacement for free-form SQL conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureFilter {
    /// Keep only these types. Empty keeps all.
    pub types: Vec<StructureType>,
    pub excluded_types: Vec<StructureType>,
    /// Case-insensitive substring match on `name`.
    pub name_like: Option<String>,
    pub host: Option<String>,
    pub folder: Option<String>,
    pub exclude_system: bool,
}

impl StructureFilter {
    pub fn of_type(structure_type: StructureType) -> Self {
        Self {
            types: vec![structure_type],
            ..Self::default()
        }
    }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Adds exclusions, skipping ones already present.
    pub fn excluding(mut self, types: &[StructureType]) -> Self {
        for kind in types {
            if !self.excluded_types.contains(kind) {
                self.excluded_types.push(*kind);
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StructureOrder {
    #[default]
    Name,
    /// Structure type first, then case-insensitive name.
    TypeThenUpperName,
    ModDate,
    VelocityVarName,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query options for listing structures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureListQuery {
    pub filter: StructureFilter,
    pub order: StructureOrder,
    pub direction: SortDirection,
    /// `None` returns every row after `offset`.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl StructureListQuery {
    pub fn ordered(order: StructureOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }
}

/// Whether a save inserted or updated the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

/// Repository interface for structure persistence.
pub trait StructureRepository {
    fn get_by_inode(&self, id: StructureId) -> RepoResult<Option<Structure>>;
    fn get_by_name(&self, name: &str) -> RepoResult<Option<Structure>>;
    fn get_by_velocity_var_name(&self, velocity_var_name: &str) -> RepoResult<Option<Structure>>;
    fn get_default(&self) -> RepoResult<Option<Structure>>;
    fn exists(&self, id: StructureId) -> RepoResult<bool>;
    fn list(&self, query: &StructureListQuery) -> RepoResult<Vec<Structure>>;
    fn count(&self, filter: &StructureFilter) -> RepoResult<u64>;
    fn save(&self, structure: &Structure) -> RepoResult<SaveOutcome>;
    /// Upserts every structure with its fields in one transaction.
    ///
    /// Nothing is written when any row fails.
    fn save_all_with_fields(
        &self,
        entries: &[(Structure, Vec<Field>)],
    ) -> RepoResult<Vec<SaveOutcome>>;
    /// Inserts the structure under a caller-chosen inode.
    fn save_with_id(&self, structure: &Structure, existing_id: StructureId) -> RepoResult<()>;
    /// Deletes the structure with its fields, workflow links and permissions.
    fn delete(&self, id: StructureId) -> RepoResult<()>;
    /// Returns `(inode, pattern)` for non-empty patterns, pattern descending.
    fn url_map_patterns(&self) -> RepoResult<Vec<(StructureId, String)>>;
    fn list_under_host(&self, host_id: &str) -> RepoResult<Vec<Structure>>;
    fn list_by_folder(&self, folder_inode: &str) -> RepoResult<Vec<Structure>>;
    fn list_by_workflow_scheme(&self, scheme_id: &str) -> RepoResult<Vec<Structure>>;
    fn upsert_workflow_scheme(&self, scheme: &WorkflowScheme) -> RepoResult<()>;
    fn link_workflow_scheme(&self, scheme_id: &str, structure_id: StructureId) -> RepoResult<()>;
    fn delete_workflow_links(&self, structure_id: StructureId) -> RepoResult<usize>;
    fn upsert_folder(&self, folder: &Folder) -> RepoResult<()>;
    fn get_folder(&self, inode: &str) -> RepoResult<Option<Folder>>;
    /// Repoints folders whose default file type is `from`. Returns rows changed.
    fn reassign_folder_default_file_type(
        &self,
        from: StructureId,
        to: StructureId,
    ) -> RepoResult<usize>;
}

/// SQLite-backed structure repository.
pub struct SqliteStructureRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStructureRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, where_sql: &str, bind: Vec<Value>) -> RepoResult<Option<Structure>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STRUCTURE_SELECT_SQL} {where_sql} ORDER BY idate ASC, inode ASC LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params_from_iter(bind))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_structure_row(row)?));
        }
        Ok(None)
    }

    fn query_many(&self, sql: &str, bind: Vec<Value>) -> RepoResult<Vec<Structure>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind))?;
        let mut structures = Vec::new();
        while let Some(row) = rows.next()? {
            structures.push(parse_structure_row(row)?);
        }
        Ok(structures)
    }
}

impl StructureRepository for SqliteStructureRepository<'_> {
    fn get_by_inode(&self, id: StructureId) -> RepoResult<Option<Structure>> {
        self.query_one("WHERE inode = ?", vec![Value::Text(id.to_string())])
    }

    fn get_by_name(&self, name: &str) -> RepoResult<Option<Structure>> {
        self.query_one("WHERE name = ?", vec![Value::Text(name.to_string())])
    }

    fn get_by_velocity_var_name(&self, velocity_var_name: &str) -> RepoResult<Option<Structure>> {
        let trimmed = velocity_var_name.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        self.query_one(
            "WHERE lower(velocity_var_name) = ?",
            vec![Value::Text(trimmed.to_lowercase())],
        )
    }

    fn get_default(&self) -> RepoResult<Option<Structure>> {
        self.query_one("WHERE default_structure = 1", Vec::new())
    }

    fn exists(&self, id: StructureId) -> RepoResult<bool> {
        structure_exists(self.conn, id)
    }

    fn list(&self, query: &StructureListQuery) -> RepoResult<Vec<Structure>> {
        let mut sql = format!("{STRUCTURE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        push_filter_sql(&query.filter, &mut sql, &mut bind_values);

        let direction = query.direction.sql();
        match query.order {
            StructureOrder::Name => sql.push_str(&format!(" ORDER BY name {direction}")),
            StructureOrder::TypeThenUpperName => sql.push_str(&format!(
                " ORDER BY structure_type {direction}, upper(name) {direction}"
            )),
            StructureOrder::ModDate => sql.push_str(&format!(" ORDER BY mod_date {direction}")),
            StructureOrder::VelocityVarName => {
                sql.push_str(&format!(" ORDER BY velocity_var_name {direction}"))
            }
        }
        sql.push_str(", inode ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        self.query_many(&sql, bind_values)
    }

    fn count(&self, filter: &StructureFilter) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(DISTINCT inode) FROM structures WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        push_filter_sql(filter, &mut sql, &mut bind_values);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative structure count {count}")))
    }

    fn save(&self, structure: &Structure) -> RepoResult<SaveOutcome> {
        upsert_structure(self.conn, structure)
    }

    fn save_all_with_fields(
        &self,
        entries: &[(Structure, Vec<Field>)],
    ) -> RepoResult<Vec<SaveOutcome>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut outcomes = Vec::with_capacity(entries.len());
        for (structure, fields) in entries {
            outcomes.push(upsert_structure(&tx, structure)?);
            for field in fields {
                upsert_field(&tx, field)?;
            }
        }
        tx.commit()?;
        Ok(outcomes)
    }

    fn save_with_id(&self, structure: &Structure, existing_id: StructureId) -> RepoResult<()> {
        structure.validate()?;
        insert_structure(self.conn, structure, existing_id)
    }

    fn delete(&self, id: StructureId) -> RepoResult<()> {
        let inode = id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM fields WHERE structure_inode = ?1;", [inode.as_str()])?;
        tx.execute(
            "DELETE FROM workflow_scheme_x_structure WHERE structure_id = ?1;",
            [inode.as_str()],
        )?;
        tx.execute("DELETE FROM permissions WHERE inode_id = ?1;", [inode.as_str()])?;
        let changed = tx.execute("DELETE FROM structures WHERE inode = ?1;", [inode.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    fn url_map_patterns(&self) -> RepoResult<Vec<(StructureId, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT inode, url_map_pattern
             FROM structures
             WHERE url_map_pattern IS NOT NULL
               AND url_map_pattern <> ''
             ORDER BY url_map_pattern DESC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut patterns = Vec::new();
        while let Some(row) = rows.next()? {
            let inode: String = row.get(0)?;
            patterns.push((parse_uuid(&inode, "structures.inode")?, row.get(1)?));
        }
        Ok(patterns)
    }

    fn list_under_host(&self, host_id: &str) -> RepoResult<Vec<Structure>> {
        self.query_many(
            &format!("{STRUCTURE_SELECT_SQL} WHERE host = ? ORDER BY name ASC, inode ASC;"),
            vec![Value::Text(host_id.to_string())],
        )
    }

    fn list_by_folder(&self, folder_inode: &str) -> RepoResult<Vec<Structure>> {
        self.query_many(
            &format!("{STRUCTURE_SELECT_SQL} WHERE folder = ? ORDER BY name ASC, inode ASC;"),
            vec![Value::Text(folder_inode.to_string())],
        )
    }

    fn list_by_workflow_scheme(&self, scheme_id: &str) -> RepoResult<Vec<Structure>> {
        self.query_many(
            &format!(
                "{STRUCTURE_SELECT_SQL}
                 WHERE inode IN (
                    SELECT structure_id
                    FROM workflow_scheme_x_structure
                    WHERE scheme_id = ?
                 )
                 ORDER BY name ASC, inode ASC;"
            ),
            vec![Value::Text(scheme_id.to_string())],
        )
    }

    fn upsert_workflow_scheme(&self, scheme: &WorkflowScheme) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO workflow_schemes (id, name) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name;",
            params![scheme.id.as_str(), scheme.name.as_str()],
        )?;
        Ok(())
    }

    fn link_workflow_scheme(&self, scheme_id: &str, structure_id: StructureId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO workflow_scheme_x_structure (scheme_id, structure_id)
             VALUES (?1, ?2);",
            params![scheme_id, structure_id.to_string()],
        )?;
        Ok(())
    }

    fn delete_workflow_links(&self, structure_id: StructureId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM workflow_scheme_x_structure WHERE structure_id = ?1;",
            [structure_id.to_string()],
        )?;
        Ok(changed)
    }

    fn upsert_folder(&self, folder: &Folder) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO folders (inode, host_id, default_file_type) VALUES (?1, ?2, ?3)
             ON CONFLICT(inode) DO UPDATE
             SET host_id = excluded.host_id,
                 default_file_type = excluded.default_file_type;",
            params![
                folder.inode.as_str(),
                folder.host_id.as_str(),
                folder.default_file_type.map(|id| id.to_string()),
            ],
        )?;
        Ok(())
    }

    fn get_folder(&self, inode: &str) -> RepoResult<Option<Folder>> {
        let row: Option<(String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT inode, host_id, default_file_type FROM folders WHERE inode = ?1;",
                [inode],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(inode, host_id, default_file_type)| -> RepoResult<Folder> {
            Ok(Folder {
                inode,
                host_id,
                default_file_type: default_file_type
                    .map(|value| parse_uuid(&value, "folders.default_file_type"))
                    .transpose()?,
            })
        })
        .transpose()
    }

    fn reassign_folder_default_file_type(
        &self,
        from: StructureId,
        to: StructureId,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE folders SET default_file_type = ?1 WHERE default_file_type = ?2;",
            params![to.to_string(), from.to_string()],
        )?;
        Ok(changed)
    }
}

fn structure_exists(conn: &Connection, id: StructureId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM structures WHERE inode = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn upsert_structure(conn: &Connection, structure: &Structure) -> RepoResult<SaveOutcome> {
    structure.validate()?;

    if structure_exists(conn, structure.inode)? {
        conn.execute(
            "UPDATE structures
             SET
                name = ?2,
                description = ?3,
                velocity_var_name = ?4,
                structure_type = ?5,
                default_structure = ?6,
                fixed = ?7,
                system = ?8,
                host = ?9,
                folder = ?10,
                url_map_pattern = ?11,
                idate = ?12,
                mod_date = ?13
             WHERE inode = ?1;",
            params![
                structure.inode.to_string(),
                structure.name.as_str(),
                structure.description.as_str(),
                structure.velocity_var_name.as_str(),
                structure.structure_type.code(),
                bool_to_int(structure.default_structure),
                bool_to_int(structure.fixed),
                bool_to_int(structure.system),
                structure.host.as_str(),
                structure.folder.as_str(),
                structure.url_map_pattern.as_deref(),
                structure.idate,
                structure.mod_date,
            ],
        )?;
        return Ok(SaveOutcome::Updated);
    }

    insert_structure(conn, structure, structure.inode)?;
    Ok(SaveOutcome::Created)
}

fn insert_structure(conn: &Connection, structure: &Structure, inode: StructureId) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO structures (
            inode,
            name,
            description,
            velocity_var_name,
            structure_type,
            default_structure,
            fixed,
            system,
            host,
            folder,
            url_map_pattern,
            idate,
            mod_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            inode.to_string(),
            structure.name.as_str(),
            structure.description.as_str(),
            structure.velocity_var_name.as_str(),
            structure.structure_type.code(),
            bool_to_int(structure.default_structure),
            bool_to_int(structure.fixed),
            bool_to_int(structure.system),
            structure.host.as_str(),
            structure.folder.as_str(),
            structure.url_map_pattern.as_deref(),
            structure.idate,
            structure.mod_date,
        ],
    )?;
    Ok(())
}

fn push_filter_sql(filter: &StructureFilter, sql: &mut String, bind_values: &mut Vec<Value>) {
    if !filter.types.is_empty() {
        sql.push_str(&format!(
            " AND structure_type IN ({})",
            placeholders(filter.types.len())
        ));
        bind_values.extend(filter.types.iter().map(|kind| Value::Integer(kind.code())));
    }

    if !filter.excluded_types.is_empty() {
        sql.push_str(&format!(
            " AND structure_type NOT IN ({})",
            placeholders(filter.excluded_types.len())
        ));
        bind_values.extend(
            filter
                .excluded_types
                .iter()
                .map(|kind| Value::Integer(kind.code())),
        );
    }

    if let Some(name_like) = filter.name_like.as_deref() {
        let trimmed = name_like.trim();
        if !trimmed.is_empty() {
            sql.push_str(" AND fold_case(name) LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!(
                "%{}%",
                escape_like(&trimmed.to_lowercase())
            )));
        }
    }

    if let Some(host) = filter.host.as_ref() {
        sql.push_str(" AND host = ?");
        bind_values.push(Value::Text(host.clone()));
    }

    if let Some(folder) = filter.folder.as_ref() {
        sql.push_str(" AND folder = ?");
        bind_values.push(Value::Text(folder.clone()));
    }

    if filter.exclude_system {
        sql.push_str(" AND system = 0");
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_structure_row(row: &Row<'_>) -> RepoResult<Structure> {
    let inode_text: String = row.get("inode")?;
    let inode = parse_uuid(&inode_text, "structures.inode")?;

    let type_code: i64 = row.get("structure_type")?;
    let structure_type = StructureType::from_code(type_code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid structure type `{type_code}` in structures.structure_type"
        ))
    })?;

    Ok(Structure {
        inode,
        name: row.get("name")?,
        description: row.get("description")?,
        velocity_var_name: row.get("velocity_var_name")?,
        structure_type,
        default_structure: int_to_bool(row.get("default_structure")?, "default_structure")?,
        fixed: int_to_bool(row.get("fixed")?, "fixed")?,
        system: int_to_bool(row.get("system")?, "system")?,
        host: row.get("host")?,
        folder: row.get("folder")?,
        url_map_pattern: row.get("url_map_pattern")?,
        idate: row.get("idate")?,
        mod_date: row.get("mod_date")?,
        fields: Vec::new(),
    })
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
