//! Content type field model.

use crate::model::structure::StructureId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a field.
pub type FieldId = Uuid;

/// Field data/presentation type, persisted as its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    TextArea,
    Wysiwyg,
    Date,
    DateTime,
    Time,
    Image,
    File,
    Tag,
    Checkbox,
    Radio,
    Select,
    MultiSelect,
    Category,
    KeyValue,
    Binary,
    HostOrFolder,
    CustomField,
    Hidden,
    Constant,
    LineDivider,
    TabDivider,
    PermissionsTab,
    RelationshipsTab,
}

impl FieldType {
    pub const ALL: [FieldType; 24] = [
        Self::Text,
        Self::TextArea,
        Self::Wysiwyg,
        Self::Date,
        Self::DateTime,
        Self::Time,
        Self::Image,
        Self::File,
        Self::Tag,
        Self::Checkbox,
        Self::Radio,
        Self::Select,
        Self::MultiSelect,
        Self::Category,
        Self::KeyValue,
        Self::Binary,
        Self::HostOrFolder,
        Self::CustomField,
        Self::Hidden,
        Self::Constant,
        Self::LineDivider,
        Self::TabDivider,
        Self::PermissionsTab,
        Self::RelationshipsTab,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::TextArea => "text_area",
            Self::Wysiwyg => "wysiwyg",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Time => "time",
            Self::Image => "image",
            Self::File => "file",
            Self::Tag => "tag",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Category => "category",
            Self::KeyValue => "key_value",
            Self::Binary => "binary",
            Self::HostOrFolder => "host_or_folder",
            Self::CustomField => "custom_field",
            Self::Hidden => "hidden",
            Self::Constant => "constant",
            Self::LineDivider => "line_divider",
            Self::TabDivider => "tab_divider",
            Self::PermissionsTab => "permissions_tab",
            Self::RelationshipsTab => "relationships_tab",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Whether content can carry a value for fields of this type.
    pub fn value_settable(self) -> bool {
        !matches!(
            self,
            Self::Constant
                | Self::LineDivider
                | Self::TabDivider
                | Self::PermissionsTab
                | Self::RelationshipsTab
        )
    }
}

/// One typed field of a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub inode: FieldId,
    pub structure_inode: StructureId,
    pub field_name: String,
    pub field_type: FieldType,
    /// Storage column on the content row, e.g. `text1`.
    pub field_contentlet: String,
    pub velocity_var_name: String,
    pub default_value: String,
    pub hint: String,
    pub regex_check: String,
    pub field_relation_type: String,
    pub sort_order: i64,
    pub required: bool,
    pub indexed: bool,
    pub listed: bool,
    pub searchable: bool,
    pub fixed: bool,
    pub read_only: bool,
}

impl Field {
    /// Creates a field with a generated inode and every flag off.
    pub fn new(
        structure_inode: StructureId,
        field_name: impl Into<String>,
        field_type: FieldType,
        field_contentlet: impl Into<String>,
        velocity_var_name: impl Into<String>,
    ) -> Self {
        Self {
            inode: Uuid::new_v4(),
            structure_inode,
            field_name: field_name.into(),
            field_type,
            field_contentlet: field_contentlet.into(),
            velocity_var_name: velocity_var_name.into(),
            default_value: String::new(),
            hint: String::new(),
            regex_check: String::new(),
            field_relation_type: String::new(),
            sort_order: 0,
            required: false,
            indexed: false,
            listed: false,
            searchable: false,
            fixed: false,
            read_only: false,
        }
    }

    pub fn value_settable(&self) -> bool {
        self.field_type.value_settable()
    }
}
