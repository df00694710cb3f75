//! Domain identifier types with validation
//!
//! Newtype wrappers so an organization id can never be passed where a
//! campaign id is expected. Numeric ids coming off the wire are validated
//! with `new`; ids read back from our own stores use `From<i64>`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a validated identifier
            ///
            /// # Returns
            ///
            /// Returns `Err` if the id is zero or negative
            pub fn new(id: i64) -> Result<Self, String> {
                if id <= 0 {
                    return Err(format!("{} must be positive, got {}", $label, id));
                }
                Ok(Self(id))
            }

            /// Returns the raw id
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let id: i64 = s
                    .trim()
                    .parse()
                    .map_err(|e| format!("invalid {}: {}", $label, e))?;
                Self::new(id)
            }
        }
    };
}

numeric_id!(
    /// Organization (tenant) identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use campex::domain::ids::OrganizationId;
    ///
    /// let org = OrganizationId::new(42).unwrap();
    /// assert_eq!(org.get(), 42);
    /// assert!(OrganizationId::new(0).is_err());
    /// ```
    OrganizationId,
    "organization id"
);

numeric_id!(
    /// Campaign identifier, unique within the platform
    CampaignId,
    "campaign id"
);

numeric_id!(
    /// Identifier of a recorded export process
    ProcessId,
    "process id"
);

/// Identifier of one orchestrator run
///
/// Each delivery of a message gets a fresh run id, so retries of the same
/// request never share artifact files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell runs apart in file names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
