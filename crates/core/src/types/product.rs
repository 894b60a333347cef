//! Purchasable product categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Product category sent as the `type` field of every cart mutation.
///
/// The cart endpoints only ever see one category per client configuration;
/// lab tests are normally booked through a separate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProductType {
    #[default]
    Medicine,
    LabTest,
}

impl ProductType {
    /// Wire literal for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Medicine => "Medicine",
            Self::LabTest => "LabTest",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Medicine" | "medicine" => Ok(Self::Medicine),
            "LabTest" | "lab_test" => Ok(Self::LabTest),
            _ => Err(format!("Unknown product type: {s}")),
        }
    }
}
