//! Field repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Fields are listed in `sort_order ASC, inode ASC` order.
//! - A field always references an existing structure (FK enforced).

use crate::model::field::{Field, FieldType};
use crate::model::structure::StructureId;
use crate::repo::structure_repo::{bool_to_int, int_to_bool, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub trait FieldRepository {
    /// Inserts or replaces one field by inode.
    fn save_field(&self, field: &Field) -> RepoResult<()>;
    fn fields_for_structure(&self, structure_inode: StructureId) -> RepoResult<Vec<Field>>;
    fn delete_fields_for_structure(&self, structure_inode: StructureId) -> RepoResult<usize>;
}

pub struct SqliteFieldRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFieldRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FieldRepository for SqliteFieldRepository<'_> {
    fn save_field(&self, field: &Field) -> RepoResult<()> {
        upsert_field(self.conn, field)
    }

    fn fields_for_structure(&self, structure_inode: StructureId) -> RepoResult<Vec<Field>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                inode,
                structure_inode,
                field_name,
                field_type,
                field_contentlet,
                velocity_var_name,
                default_value,
                hint,
                regex_check,
                field_relation_type,
                sort_order,
                required,
                indexed,
                listed,
                searchable,
                fixed,
                read_only
             FROM fields
             WHERE structure_inode = ?1
             ORDER BY sort_order ASC, inode ASC;",
        )?;
        let mut rows = stmt.query([structure_inode.to_string()])?;
        let mut fields = Vec::new();
        while let Some(row) = rows.next()? {
            fields.push(parse_field_row(row)?);
        }
        Ok(fields)
    }

    fn delete_fields_for_structure(&self, structure_inode: StructureId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM fields WHERE structure_inode = ?1;",
            [structure_inode.to_string()],
        )?;
        Ok(changed)
    }
}

/// Inserts or replaces one field row; usable inside a transaction.
pub(crate) fn upsert_field(conn: &Connection, field: &Field) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO fields (
            inode,
            structure_inode,
            field_name,
            field_type,
            field_contentlet,
            velocity_var_name,
            default_value,
            hint,
            regex_check,
            field_relation_type,
            sort_order,
            required,
            indexed,
            listed,
            searchable,
            fixed,
            read_only
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT(inode) DO UPDATE SET
            structure_inode = excluded.structure_inode,
            field_name = excluded.field_name,
            field_type = excluded.field_type,
            field_contentlet = excluded.field_contentlet,
            velocity_var_name = excluded.velocity_var_name,
            default_value = excluded.default_value,
            hint = excluded.hint,
            regex_check = excluded.regex_check,
            field_relation_type = excluded.field_relation_type,
            sort_order = excluded.sort_order,
            required = excluded.required,
            indexed = excluded.indexed,
            listed = excluded.listed,
            searchable = excluded.searchable,
            fixed = excluded.fixed,
            read_only = excluded.read_only;",
        params![
            field.inode.to_string(),
            field.structure_inode.to_string(),
            field.field_name.as_str(),
            field.field_type.as_str(),
            field.field_contentlet.as_str(),
            field.velocity_var_name.as_str(),
            field.default_value.as_str(),
            field.hint.as_str(),
            field.regex_check.as_str(),
            field.field_relation_type.as_str(),
            field.sort_order,
            bool_to_int(field.required),
            bool_to_int(field.indexed),
            bool_to_int(field.listed),
            bool_to_int(field.searchable),
            bool_to_int(field.fixed),
            bool_to_int(field.read_only),
        ],
    )?;
    Ok(())
}

fn parse_field_row(row: &Row<'_>) -> RepoResult<Field> {
    let inode_text: String = row.get("inode")?;
    let structure_text: String = row.get("structure_inode")?;
    let type_text: String = row.get("field_type")?;
    let field_type = FieldType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid field type `{type_text}` in fields.field_type"))
    })?;

    Ok(Field {
        inode: parse_uuid(&inode_text, "fields.inode")?,
        structure_inode: parse_uuid(&structure_text, "fields.structure_inode")?,
        field_name: row.get("field_name")?,
        field_type,
        field_contentlet: row.get("field_contentlet")?,
        velocity_var_name: row.get("velocity_var_name")?,
        default_value: row.get("default_value")?,
        hint: row.get("hint")?,
        regex_check: row.get("regex_check")?,
        field_relation_type: row.get("field_relation_type")?,
        sort_order: row.get("sort_order")?,
        required: int_to_bool(row.get("required")?, "fields.required")?,
        indexed: int_to_bool(row.get("indexed")?, "fields.indexed")?,
        listed: int_to_bool(row.get("listed")?, "fields.listed")?,
        searchable: int_to_bool(row.get("searchable")?, "fields.searchable")?,
        fixed: int_to_bool(row.get("fixed")?, "fields.fixed")?,
        read_only: int_to_bool(row.get("read_only")?, "fields.read_only")?,
    })
}
