//! Deployment tiers.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named deployment tier.
///
/// Products, unlock keys and sessions are partitioned by environment: a key
/// minted for `uat` is invisible to a `prod` client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development.
    Dev,
    /// User acceptance testing.
    Uat,
    /// Production.
    Prod,
}

impl Environment {
    /// All environments, in promotion order.
    pub const ALL: [Environment; 3] = [Self::Dev, Self::Uat, Self::Prod];

    /// Returns the wire/storage name of this environment.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Uat => "uat",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "uat" => Ok(Self::Uat),
            "prod" => Ok(Self::Prod),
            other => Err(Error::UnknownEnvironment(other.to_string())),
        }
    }
}
