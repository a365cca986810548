//! The Data Store: an immutable snapshot of requests, artists, presets and
//! rules, loaded once per run.
//!
//! Everything is type-checked here so the pipeline stages never see malformed
//! input. Lookups return `None` for a missing key; only loading can fail.

use std::{
  collections::{BTreeMap, BTreeSet},
  fs,
  path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

use crate::{
  DataLoadError,
  artist::Artist,
  preset::{Preset, RawPreset},
  request::Request,
  rule::{RawRule, Rule},
};

pub const REQUESTS_FILE: &str = "request.json";
pub const ARTISTS_FILE: &str = "artists.json";
pub const PRESETS_FILE: &str = "presets.json";
pub const RULES_FILE: &str = "rules.json";

/// Locations of the four dataset files.
#[derive(Debug, Clone)]
pub struct DatasetPaths {
  pub requests: PathBuf,
  pub artists:  PathBuf,
  pub presets:  PathBuf,
  pub rules:    PathBuf,
}

impl DatasetPaths {
  /// The conventional file names inside `dir`.
  pub fn in_dir(dir: impl AsRef<Path>) -> Self {
    let dir = dir.as_ref();
    Self {
      requests: dir.join(REQUESTS_FILE),
      artists:  dir.join(ARTISTS_FILE),
      presets:  dir.join(PRESETS_FILE),
      rules:    dir.join(RULES_FILE),
    }
  }
}

/// Read-only reference data shared by every pipeline in the process.
///
/// No field is mutated after construction, so a `Dataset` behind an `Arc` is
/// safe to share across threads without locking.
#[derive(Debug, Clone)]
pub struct Dataset {
  requests: BTreeMap<String, Request>,
  presets:  BTreeMap<String, Preset>,
  /// In file order.
  artists:  Vec<Artist>,
  /// In declared order; `rules[i].index == i`.
  rules:    Vec<Rule>,
}

impl Dataset {
  /// Read and validate all four files.
  pub fn load(paths: &DatasetPaths) -> Result<Self, DataLoadError> {
    let requests = read_json(&paths.requests)?;
    let artists = read_json(&paths.artists)?;
    let presets = read_json(&paths.presets)?;
    let rules = read_json(&paths.rules)?;
    Self::from_parts(requests, artists, presets, rules)
  }

  /// Parse the four datasets from in-memory JSON documents.
  pub fn from_json(
    requests: &str,
    artists: &str,
    presets: &str,
    rules: &str,
  ) -> Result<Self, DataLoadError> {
    Self::from_parts(
      parse_json(requests, REQUESTS_FILE)?,
      parse_json(artists, ARTISTS_FILE)?,
      parse_json(presets, PRESETS_FILE)?,
      parse_json(rules, RULES_FILE)?,
    )
  }

  fn from_parts(
    requests: Vec<Request>,
    artists: Vec<Artist>,
    presets: BTreeMap<String, RawPreset>,
    rules: Vec<RawRule>,
  ) -> Result<Self, DataLoadError> {
    let mut by_id = BTreeMap::new();
    for request in requests {
      if by_id.contains_key(&request.id) {
        return Err(DataLoadError::DuplicateRequest(request.id));
      }
      by_id.insert(request.id.clone(), request);
    }

    let mut seen = BTreeSet::new();
    let mut checked = Vec::with_capacity(artists.len());
    for artist in artists {
      if !seen.insert(artist.id.clone()) {
        return Err(DataLoadError::DuplicateArtist(artist.id));
      }
      checked.push(artist.checked()?);
    }

    let presets = presets
      .into_iter()
      .map(|(account, raw)| Ok((account.clone(), raw.into_preset(account)?)))
      .collect::<Result<BTreeMap<_, _>, DataLoadError>>()?;

    let known: BTreeSet<&str> = by_id
      .values()
      .flat_map(|r: &Request| r.attributes.keys().map(String::as_str))
      .collect();
    let rules = rules
      .into_iter()
      .enumerate()
      .map(|(index, raw)| raw.into_rule(index, &known))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self { requests: by_id, presets, artists: checked, rules })
  }

  // ── Lookups ───────────────────────────────────────────────────────────────

  pub fn request_by_id(&self, id: &str) -> Option<&Request> { self.requests.get(id) }

  pub fn preset_by_account(&self, account: &str) -> Option<&Preset> {
    self.presets.get(account)
  }

  pub fn artists_all(&self) -> &[Artist] { &self.artists }

  pub fn rules_all(&self) -> &[Rule] { &self.rules }

  /// All requests in id order.
  pub fn requests_all(&self) -> impl Iterator<Item = &Request> { self.requests.values() }

  pub fn presets_all(&self) -> &BTreeMap<String, Preset> { &self.presets }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
  let raw = fs::read_to_string(path)
    .map_err(|source| DataLoadError::Io { path: path.to_path_buf(), source })?;
  serde_json::from_str(&raw)
    .map_err(|source| DataLoadError::Parse { path: path.to_path_buf(), source })
}

fn parse_json<T: DeserializeOwned>(raw: &str, name: &str) -> Result<T, DataLoadError> {
  serde_json::from_str(raw).map_err(|source| DataLoadError::Parse { path: name.into(), source })
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fixture_loads() {
    let d = fixture::dataset();
    assert_eq!(d.requests_all().count(), 5);
    assert_eq!(d.artists_all().len(), 5);
    assert_eq!(d.rules_all().len(), 4);
    assert!(d.preset_by_account("ArcadiaXR").is_some());
    assert!(d.preset_by_account("GhostCo").is_none());
    assert!(d.request_by_id("req-999").is_none());
  }

  #[test]
  fn skills_are_normalised() {
    let d = fixture::dataset();
    let dev = d.artists_all().iter().find(|a| a.id == "a-4").unwrap();
    assert!(dev.skills.contains("unreal"));
  }

  #[test]
  fn rule_indices_follow_file_order() {
    let d = fixture::dataset();
    for (i, rule) in d.rules_all().iter().enumerate() {
      assert_eq!(rule.index, i);
    }
  }

  #[test]
  fn over_capacity_artist_is_rejected() {
    let artists =
      r#"[{"id":"a","name":"A","skills":["x"],"capacity_used":3,"capacity_max":2}]"#;
    let err = Dataset::from_json("[]", artists, "{}", "[]").unwrap_err();
    assert!(matches!(err, DataLoadError::CapacityExceeded { used: 3, max: 2, .. }));
  }

  #[test]
  fn artist_without_skills_is_rejected() {
    let artists = r#"[{"id":"a","name":"A","skills":[],"capacity_used":0,"capacity_max":2}]"#;
    let err = Dataset::from_json("[]", artists, "{}", "[]").unwrap_err();
    assert!(matches!(err, DataLoadError::NoSkills { .. }));
  }

  #[test]
  fn duplicate_request_is_rejected() {
    let requests = r#"[
      {"id":"r","account":"A","engine":"Web"},
      {"id":"r","account":"B","engine":"Web"}
    ]"#;
    let err = Dataset::from_json(requests, "[]", "{}", "[]").unwrap_err();
    assert!(matches!(err, DataLoadError::DuplicateRequest(id) if id == "r"));
  }

  #[test]
  fn unparsable_document_is_rejected() {
    let err = Dataset::from_json("{", "[]", "{}", "[]").unwrap_err();
    assert!(matches!(err, DataLoadError::Parse { .. }));
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let paths = DatasetPaths::in_dir("/nonexistent/atelier-data");
    let err = Dataset::load(&paths).unwrap_err();
    assert!(matches!(err, DataLoadError::Io { .. }));
  }

  #[test]
  fn load_reads_the_data_directory() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");
    let d = Dataset::load(&DatasetPaths::in_dir(dir)).unwrap();
    assert!(d.request_by_id("req-001").is_some());
  }
}
