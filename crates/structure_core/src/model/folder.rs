//! Folder and workflow scheme records referenced by structures.

use crate::model::structure::StructureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub inode: String,
    /// Owning site; blank or `SYSTEM_HOST` means the system host.
    pub host_id: String,
    /// File asset structure used for uploads into this folder.
    pub default_file_type: Option<StructureId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowScheme {
    pub id: String,
    pub name: String,
}
