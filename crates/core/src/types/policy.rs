//! Catalog reconciliation policies.

use serde::{Deserialize, Serialize};

/// What to do when a feed names an existing category ID with a different name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryNamePolicy {
    /// Keep the stored name and only record the mismatch in the logs.
    #[default]
    Preserve,
    /// Overwrite the stored name with the feed's name.
    Update,
    /// Fail the whole ingestion.
    Reject,
}

impl std::fmt::Display for CategoryNamePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preserve => write!(f, "preserve"),
            Self::Update => write!(f, "update"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for CategoryNamePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "update" => Ok(Self::Update),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "invalid category name policy: {other} (expected preserve, update or reject)"
            )),
        }
    }
}
