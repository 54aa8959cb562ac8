//! Caller identity consulted by permission checks.

use serde::{Deserialize, Serialize};

/// Role granted to every visitor when frontend roles are respected.
pub const ROLE_CMS_ANONYMOUS: &str = "cms_anonymous";
/// Role granted to any authenticated visitor when frontend roles are respected.
pub const ROLE_LOGGED_IN_SITE_USER: &str = "logged_in_site_user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub role_ids: Vec<String>,
    /// Administrators bypass permission checks.
    pub admin: bool,
}

impl User {
    pub fn new(user_id: impl Into<String>, role_ids: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role_ids,
            admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role_ids: Vec::new(),
            admin: true,
        }
    }
}
