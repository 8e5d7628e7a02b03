//! Identifiers for simulation entities

use serde::{Deserialize, Serialize};

/// Household member. The primary member owns the retirement accounts and
/// drives the retirement/RMD schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonId {
    Primary,
    Spouse,
}

impl PersonId {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            PersonId::Primary => 0,
            PersonId::Spouse => 1,
        }
    }
}
