//! License tiers and the structure types each tier hides.

use crate::model::structure::StructureType;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Installed license tier. Higher tiers unlock more structure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LicenseLevel {
    Community,
    Standard,
    Professional,
    Prime,
    Platform,
}

impl LicenseLevel {
    pub fn code(self) -> u32 {
        match self {
            Self::Community => 100,
            Self::Standard => 200,
            Self::Professional => 300,
            Self::Prime => 400,
            Self::Platform => 500,
        }
    }

    /// Types hidden from user-facing listings and counts.
    ///
    /// Below Standard, forms and personas are enterprise-only.
    pub fn hidden_for_users(self) -> &'static [StructureType] {
        if self.code() < 200 {
            &[StructureType::Form, StructureType::Persona]
        } else {
            &[]
        }
    }

    /// Types hidden from the unfiltered plain listing.
    pub fn hidden_for_listing(self) -> &'static [StructureType] {
        if self.code() <= 100 {
            &[StructureType::Form]
        } else {
            &[]
        }
    }
}

impl Default for LicenseLevel {
    fn default() -> Self {
        Self::Community
    }
}

impl From<LicenseLevel> for u32 {
    fn from(value: LicenseLevel) -> Self {
        value.code()
    }
}

impl TryFrom<u32> for LicenseLevel {
    type Error = LicenseLevelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            100 => Ok(Self::Community),
            200 => Ok(Self::Standard),
            300 => Ok(Self::Professional),
            400 => Ok(Self::Prime),
            500 => Ok(Self::Platform),
            other => Err(LicenseLevelError(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseLevelError(pub u32);

impl Display for LicenseLevelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported license level {}; expected 100|200|300|400|500",
            self.0
        )
    }
}

impl Error for LicenseLevelError {}
