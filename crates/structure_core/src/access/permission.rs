//! Role-based read/write checks over structures.
//!
//! # Invariants
//! - Administrators pass every check.
//! - Write permission does not imply read permission; bits are independent.
//! - Without a user and without frontend roles, nothing is visible.

use crate::db::DbResult;
use crate::model::structure::Structure;
use crate::model::user::{User, ROLE_CMS_ANONYMOUS, ROLE_LOGGED_IN_SITE_USER};
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};

/// Permission bit stored in `permissions.permission`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    Read,
    Write,
}

impl PermissionLevel {
    pub fn bit(self) -> i64 {
        match self {
            Self::Read => 1,
            Self::Write => 2,
        }
    }
}

/// Permission decision contract consumed by the structure service.
pub trait PermissionChecker {
    fn has_permission(
        &self,
        structure: &Structure,
        level: PermissionLevel,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> DbResult<bool>;

    /// Drops permission rows bound to the structure so it inherits again.
    fn reset_permission_references(&self, structure: &Structure) -> DbResult<()>;

    /// Keeps only structures the user can read.
    fn filter_readable(
        &self,
        structures: Vec<Structure>,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> DbResult<Vec<Structure>> {
        let mut kept = Vec::with_capacity(structures.len());
        for structure in structures {
            if self.has_permission(
                &structure,
                PermissionLevel::Read,
                user,
                respect_frontend_roles,
            )? {
                kept.push(structure);
            }
        }
        Ok(kept)
    }
}

/// Checker for trusted system callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPermissions;

impl PermissionChecker for AllowAllPermissions {
    fn has_permission(
        &self,
        _structure: &Structure,
        _level: PermissionLevel,
        _user: Option<&User>,
        _respect_frontend_roles: bool,
    ) -> DbResult<bool> {
        Ok(true)
    }

    fn reset_permission_references(&self, _structure: &Structure) -> DbResult<()> {
        Ok(())
    }
}

/// SQLite-backed checker reading the `permissions` table.
pub struct SqlitePermissionChecker<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePermissionChecker<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Adds `level` to the bits the role holds on the inode.
    pub fn grant(&self, structure: &Structure, role_id: &str, level: PermissionLevel) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO permissions (inode_id, role_id, permission)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(inode_id, role_id)
             DO UPDATE SET permission = permission | excluded.permission;",
            params![structure.inode.to_string(), role_id, level.bit()],
        )?;
        Ok(())
    }
}

impl PermissionChecker for SqlitePermissionChecker<'_> {
    fn has_permission(
        &self,
        structure: &Structure,
        level: PermissionLevel,
        user: Option<&User>,
        respect_frontend_roles: bool,
    ) -> DbResult<bool> {
        if user.is_some_and(|user| user.admin) {
            return Ok(true);
        }

        let roles = effective_roles(user, respect_frontend_roles);
        if roles.is_empty() {
            return Ok(false);
        }

        let placeholders = vec!["?"; roles.len()].join(", ");
        let sql = format!(
            "SELECT EXISTS(
                SELECT 1
                FROM permissions
                WHERE inode_id = ?
                  AND (permission & ?) != 0
                  AND role_id IN ({placeholders})
            );"
        );
        let mut bind_values: Vec<rusqlite::types::Value> = vec![
            structure.inode.to_string().into(),
            level.bit().into(),
        ];
        bind_values.extend(roles.into_iter().map(rusqlite::types::Value::from));

        let exists: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(exists == 1)
    }

    fn reset_permission_references(&self, structure: &Structure) -> DbResult<()> {
        self.conn.execute(
            "DELETE FROM permissions WHERE inode_id = ?1;",
            [structure.inode.to_string()],
        )?;
        Ok(())
    }
}

fn effective_roles(user: Option<&User>, respect_frontend_roles: bool) -> Vec<String> {
    let mut roles: Vec<String> = user
        .map(|user| user.role_ids.clone())
        .unwrap_or_default();
    if respect_frontend_roles {
        roles.push(ROLE_CMS_ANONYMOUS.to_string());
        if user.is_some() {
            roles.push(ROLE_LOGGED_IN_SITE_USER.to_string());
        }
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::effective_roles;
    use crate::model::user::{User, ROLE_CMS_ANONYMOUS, ROLE_LOGGED_IN_SITE_USER};

    #[test]
    fn frontend_roles_extend_effective_roles() {
        let user = User::new("u1", vec!["editor".to_string()]);
        assert_eq!(effective_roles(Some(&user), false), vec!["editor"]);
        assert_eq!(
            effective_roles(Some(&user), true),
            vec!["editor", ROLE_CMS_ANONYMOUS, ROLE_LOGGED_IN_SITE_USER]
        );
        assert_eq!(effective_roles(None, true), vec![ROLE_CMS_ANONYMOUS]);
        assert!(effective_roles(None, false).is_empty());
    }
}
