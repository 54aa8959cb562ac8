//! Structure (content type) model.
//!
//! # Responsibility
//! - Define the canonical content type record and its type taxonomy.
//! - Derive and validate velocity variable names.
//!
//! # Invariants
//! - `inode` is stable and never reused for another structure.
//! - `velocity_var_name` starts with an ASCII letter and holds only
//!   alphanumerics and `_`.

use crate::model::field::{Field, FieldType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a structure.
pub type StructureId = Uuid;

/// Host identifier for structures not bound to a site.
pub const SYSTEM_HOST: &str = "SYSTEM_HOST";
/// Folder identifier for structures not bound to a folder.
pub const SYSTEM_FOLDER: &str = "SYSTEM_FOLDER";

static VELOCITY_VAR_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("velocity var name pattern is valid")
});

/// Base kind of a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    Content,
    Widget,
    Form,
    FileAsset,
    HtmlPage,
    Persona,
}

impl StructureType {
    pub const ALL: [StructureType; 6] = [
        Self::Content,
        Self::Widget,
        Self::Form,
        Self::FileAsset,
        Self::HtmlPage,
        Self::Persona,
    ];

    /// Integer code persisted in `structures.structure_type`.
    pub fn code(self) -> i64 {
        match self {
            Self::Content => 1,
            Self::Widget => 2,
            Self::Form => 3,
            Self::FileAsset => 4,
            Self::HtmlPage => 5,
            Self::Persona => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

/// Validation errors for structure writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureValidationError {
    BlankName,
    InvalidVelocityVarName(String),
}

impl Display for StructureValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "structure name must not be blank"),
            Self::InvalidVelocityVarName(value) => {
                write!(f, "invalid velocity variable name `{value}`")
            }
        }
    }
}

impl Error for StructureValidationError {}

/// Content type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub inode: StructureId,
    pub name: String,
    pub description: String,
    pub velocity_var_name: String,
    pub structure_type: StructureType,
    pub default_structure: bool,
    pub fixed: bool,
    pub system: bool,
    pub host: String,
    pub folder: String,
    pub url_map_pattern: Option<String>,
    /// Creation timestamp, epoch milliseconds.
    pub idate: i64,
    /// Last modification timestamp, epoch milliseconds.
    pub mod_date: i64,
    /// Loaded on demand; not written by structure saves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

impl Structure {
    /// Creates a structure with a generated inode and a derived variable name.
    pub fn new(structure_type: StructureType, name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), structure_type, name)
    }

    pub fn with_id(inode: StructureId, structure_type: StructureType, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            inode,
            velocity_var_name: derive_velocity_var_name(&name),
            name,
            description: String::new(),
            structure_type,
            default_structure: false,
            fixed: false,
            system: false,
            host: SYSTEM_HOST.to_string(),
            folder: SYSTEM_FOLDER.to_string(),
            url_map_pattern: None,
            idate: 0,
            mod_date: 0,
            fields: Vec::new(),
        }
    }

    /// Checks write-time invariants.
    pub fn validate(&self) -> Result<(), StructureValidationError> {
        if self.name.trim().is_empty() {
            return Err(StructureValidationError::BlankName);
        }
        if !VELOCITY_VAR_NAME_RE.is_match(&self.velocity_var_name) {
            return Err(StructureValidationError::InvalidVelocityVarName(
                self.velocity_var_name.clone(),
            ));
        }
        Ok(())
    }

    /// Finds a loaded field by its velocity variable name.
    pub fn field_by_var(&self, velocity_var_name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.velocity_var_name == velocity_var_name)
    }

    /// Counts loaded fields of the given type.
    pub fn count_fields_of_type(&self, field_type: FieldType) -> usize {
        self.fields
            .iter()
            .filter(|field| field.field_type == field_type)
            .count()
    }
}

/// Derives a camel-cased variable name from a display name.
///
/// Non-alphanumeric characters split words; the first character is
/// lowercased. Names starting with a digit get a `type` prefix.
pub fn derive_velocity_var_name(name: &str) -> String {
    let mut out = String::new();
    for word in name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if out.is_empty() {
                out.push(first.to_ascii_lowercase());
            } else {
                out.push(first.to_ascii_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "type");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{derive_velocity_var_name, Structure, StructureType, StructureValidationError};

    #[test]
    fn derives_camel_case_var_names() {
        assert_eq!(derive_velocity_var_name("News Item"), "newsItem");
        assert_eq!(derive_velocity_var_name("Web Page Content"), "webPageContent");
        assert_eq!(derive_velocity_var_name("  blog-post  "), "blogPost");
        assert_eq!(derive_velocity_var_name("2024 Events"), "type2024Events");
    }

    #[test]
    fn structure_type_codes_roundtrip() {
        for kind in StructureType::ALL {
            assert_eq!(StructureType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(StructureType::from_code(0), None);
        assert_eq!(StructureType::from_code(7), None);
    }

    #[test]
    fn validate_rejects_blank_name_and_bad_var_name() {
        let mut structure = Structure::new(StructureType::Content, "   ");
        assert_eq!(
            structure.validate(),
            Err(StructureValidationError::BlankName)
        );

        structure.name = "Valid".to_string();
        structure.velocity_var_name = "9lives".to_string();
        assert!(matches!(
            structure.validate(),
            Err(StructureValidationError::InvalidVelocityVarName(_))
        ));

        structure.velocity_var_name = "valid_Name1".to_string();
        assert!(structure.validate().is_ok());
    }
}
