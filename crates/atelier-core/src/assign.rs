//! Capacity-aware artist assignment.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{artist::Artist, dataset::Dataset, request::Request};

// ─── Result types ────────────────────────────────────────────────────────────

/// Why an assignment came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
  Assigned,
  /// No artist holds every required skill.
  NoSkilledArtist,
  /// Skilled artists exist but all of them are full.
  AtCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
  pub artist_id:   Option<String>,
  pub artist_name: Option<String>,
  /// Reproducible from the same inputs; part of the audit trail.
  pub reason:      String,
  pub status:      AssignmentStatus,
}

// ─── Capacity mode ───────────────────────────────────────────────────────────

/// Whether a successful assignment consumes capacity for later requests.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CapacityMode {
  /// Every call sees the loaded snapshot; repeated calls agree.
  #[default]
  Soft,
  /// Each assignment reserves one unit in an engine-local ledger.
  Reserving,
}

/// Reservations layered over the immutable snapshot. The [`Dataset`] itself
/// is never touched.
#[derive(Debug, Default)]
pub struct CapacityLedger {
  mode:     CapacityMode,
  reserved: Mutex<BTreeMap<String, u32>>,
}

impl CapacityLedger {
  pub fn new(mode: CapacityMode) -> Self { Self { mode, reserved: Mutex::default() } }

  pub fn mode(&self) -> CapacityMode { self.mode }

  /// Units reserved so far for `artist_id`.
  pub fn reserved(&self, artist_id: &str) -> u32 {
    let reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);
    reserved.get(artist_id).copied().unwrap_or(0)
  }

  /// Select an artist for `request`, reserving a unit in
  /// [`CapacityMode::Reserving`]. The ledger lock is held across selection
  /// and reservation so concurrent pipelines cannot double-book a slot.
  pub fn assign(&self, dataset: &Dataset, request: &Request) -> Assignment {
    let mut reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);
    let assignment = select(dataset.artists_all(), &request.required_skills, &reserved);

    if self.mode == CapacityMode::Reserving
      && let Some(id) = &assignment.artist_id
    {
      *reserved.entry(id.clone()).or_insert(0) += 1;
    }
    assignment
  }

  /// Give back the unit `assignment` reserved. No-op in
  /// [`CapacityMode::Soft`] or when nobody was assigned.
  pub fn release(&self, assignment: &Assignment) {
    if self.mode != CapacityMode::Reserving {
      return;
    }
    let Some(id) = &assignment.artist_id else { return };

    let mut reserved = self.reserved.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(units) = reserved.get_mut(id) {
      *units = units.saturating_sub(1);
      if *units == 0 {
        reserved.remove(id);
      }
    }
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

fn skill_list(skills: &BTreeSet<String>) -> String {
  let names: Vec<&str> = skills.iter().map(String::as_str).collect();
  format!("[{}]", names.join(", "))
}

/// Pick the qualified artist with the lowest load, ties broken by id.
pub fn select(
  artists: &[Artist],
  required: &BTreeSet<String>,
  reserved: &BTreeMap<String, u32>,
) -> Assignment {
  let used = |a: &Artist| a.capacity_used + reserved.get(&a.id).copied().unwrap_or(0);

  let skilled: Vec<&Artist> = artists.iter().filter(|a| a.has_skills(required)).collect();
  let winner = skilled
    .iter()
    .copied()
    .filter(|&a| used(a) < a.capacity_max)
    .min_by(|&a, &b| used(a).cmp(&used(b)).then_with(|| a.id.cmp(&b.id)));

  match winner {
    Some(artist) => Assignment {
      artist_id:   Some(artist.id.clone()),
      artist_name: Some(artist.name.clone()),
      reason:      format!(
        "{} has required skills {} and capacity ({}/{})",
        artist.name,
        skill_list(required),
        used(artist),
        artist.capacity_max,
      ),
      status:      AssignmentStatus::Assigned,
    },
    None if skilled.is_empty() => Assignment {
      artist_id:   None,
      artist_name: None,
      reason:      format!("No artist has the required skills {}", skill_list(required)),
      status:      AssignmentStatus::NoSkilledArtist,
    },
    None => {
      let ids: Vec<&str> = skilled.iter().map(|a| a.id.as_str()).collect();
      Assignment {
        artist_id:   None,
        artist_name: None,
        reason:      format!(
          "All artists with the required skills {} are at capacity ({})",
          skill_list(required),
          ids.join(", "),
        ),
        status:      AssignmentStatus::AtCapacity,
      }
    }
  }
}
