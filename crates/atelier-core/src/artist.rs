//! Artists and their capacity snapshot.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::DataLoadError;

/// An artist as captured in the run's snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
  pub id:            String,
  pub name:          String,
  /// Lower-cased skill names; normalised by [`Artist::checked`].
  pub skills:        BTreeSet<String>,
  #[serde(alias = "active_load")]
  pub capacity_used: u32,
  #[serde(alias = "capacity_concurrent")]
  pub capacity_max:  u32,
}

impl Artist {
  /// Enforce the snapshot invariants and normalise skill names.
  pub(crate) fn checked(mut self) -> Result<Self, DataLoadError> {
    if self.capacity_used > self.capacity_max {
      return Err(DataLoadError::CapacityExceeded {
        artist: self.id,
        used:   self.capacity_used,
        max:    self.capacity_max,
      });
    }
    if self.skills.is_empty() {
      return Err(DataLoadError::NoSkills { artist: self.id });
    }
    self.skills = self.skills.iter().map(|s| s.to_lowercase()).collect();
    Ok(self)
  }

  pub fn has_skills(&self, required: &BTreeSet<String>) -> bool {
    required.is_subset(&self.skills)
  }
}
