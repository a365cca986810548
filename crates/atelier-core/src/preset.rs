//! Per-account presets: naming policy and texture channel packing.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::DataLoadError;

// ─── Channels ────────────────────────────────────────────────────────────────

/// One of the four channels of a packed texture. Declaration order is the
/// canonical r, g, b, a order used when reporting missing channels.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Display,
  EnumIter,
  EnumString,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  R,
  G,
  B,
  A,
}

// ─── Naming pattern ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Literal(String),
  Placeholder(String),
}

/// A compiled naming template such as `ARC_{asset}_{variant}`.
///
/// A descriptor satisfies the pattern when every literal appears in order and
/// every placeholder covers at least one character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern {
  source:   String,
  segments: Vec<Segment>,
}

impl NamingPattern {
  /// Compile `source`. The error is the human-readable reason; callers attach
  /// the account.
  pub fn compile(source: &str) -> Result<Self, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
      match c {
        '{' => {
          let mut name = String::new();
          let mut closed = false;
          for c in chars.by_ref() {
            match c {
              '}' => {
                closed = true;
                break;
              }
              '{' => return Err("nested '{'".into()),
              c => name.push(c),
            }
          }
          if !closed {
            return Err("unclosed '{'".into());
          }
          if name.trim().is_empty() {
            return Err("empty placeholder".into());
          }
          if let Some(Segment::Placeholder(_)) = segments.last()
            && literal.is_empty()
          {
            return Err(format!("placeholder {{{name}}} directly follows another"));
          }
          if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
          }
          segments.push(Segment::Placeholder(name));
        }
        '}' => return Err("unmatched '}'".into()),
        c => literal.push(c),
      }
    }
    if !literal.is_empty() {
      segments.push(Segment::Literal(literal));
    }

    Ok(Self { source: source.to_owned(), segments })
  }

  pub fn as_str(&self) -> &str { &self.source }

  pub fn matches(&self, descriptor: &str) -> bool {
    let mut dead_ends = HashSet::new();
    match_from(&self.segments, descriptor, 0, 0, &mut dead_ends)
  }
}

/// Does `input[pos..]` satisfy `segments[seg..]`? States already known to
/// fail are kept in `dead_ends`, bounding the work to segments × offsets.
fn match_from(
  segments: &[Segment],
  input: &str,
  seg: usize,
  pos: usize,
  dead_ends: &mut HashSet<(usize, usize)>,
) -> bool {
  let Some(segment) = segments.get(seg) else {
    return pos == input.len();
  };
  if dead_ends.contains(&(seg, pos)) {
    return false;
  }

  let rest = &input[pos..];
  let matched = match segment {
    Segment::Literal(lit) => {
      rest.starts_with(lit.as_str())
        && match_from(segments, input, seg + 1, pos + lit.len(), dead_ends)
    }
    // A placeholder covers at least one character.
    Segment::Placeholder(_) => rest
      .char_indices()
      .skip(1)
      .map(|(i, _)| i)
      .chain(Some(rest.len()))
      .filter(|&i| i > 0)
      .any(|i| match_from(segments, input, seg + 1, pos + i, dead_ends)),
  };

  if !matched {
    dead_ends.insert((seg, pos));
  }
  matched
}

// ─── Preset ──────────────────────────────────────────────────────────────────

/// The configuration an account's requests are validated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
  pub account: String,
  #[serde(serialize_with = "serialize_pattern")]
  pub naming:  Option<NamingPattern>,
  /// Channel → authored map name (e.g. `r` → `ao`).
  pub packing: BTreeMap<Channel, String>,
}

impl Preset {
  pub fn channels(&self) -> BTreeSet<Channel> { self.packing.keys().copied().collect() }
}

fn serialize_pattern<S>(pattern: &Option<NamingPattern>, s: S) -> Result<S::Ok, S::Error>
where
  S: serde::Serializer,
{
  pattern.as_ref().map(NamingPattern::as_str).serialize(s)
}

/// Wire shape of a preset inside `presets.json` (keyed by account).
#[derive(Debug, Deserialize)]
pub(crate) struct RawPreset {
  #[serde(default)]
  pub naming:  Option<String>,
  #[serde(default)]
  pub packing: BTreeMap<String, String>,
}

impl RawPreset {
  pub(crate) fn into_preset(self, account: String) -> Result<Preset, DataLoadError> {
    let naming = match self.naming {
      None => None,
      Some(p) if p.is_empty() => {
        return Err(DataLoadError::EmptyNamingPattern { account });
      }
      Some(p) => Some(NamingPattern::compile(&p).map_err(|reason| {
        DataLoadError::MalformedNamingPattern { account: account.clone(), reason }
      })?),
    };

    let mut packing = BTreeMap::new();
    for (key, map) in self.packing {
      let channel: Channel = key.parse().map_err(|_| DataLoadError::UnknownChannel {
        account: account.clone(),
        channel: key.clone(),
      })?;
      packing.insert(channel, map);
    }

    Ok(Preset { account, naming, packing })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pattern_with_literals_and_placeholders() {
    let p = NamingPattern::compile("ARC_{asset}_{variant}").unwrap();
    assert!(p.matches("ARC_crate_v2"));
    assert!(p.matches("ARC_big_crate_v2"));
    assert!(!p.matches("ARC_crate"));
    assert!(!p.matches("ARC__v2"));
    assert!(!p.matches("XYZ_crate_v2"));
  }

  #[test]
  fn trailing_literal_must_match_exactly() {
    let p = NamingPattern::compile("{asset}.fbx").unwrap();
    assert!(p.matches("chair.fbx"));
    assert!(!p.matches(".fbx"));
    assert!(!p.matches("chair.fbx.bak"));
  }

  #[test]
  fn pattern_without_placeholders_is_exact() {
    let p = NamingPattern::compile("fixed").unwrap();
    assert!(p.matches("fixed"));
    assert!(!p.matches("fixed2"));
  }

  #[test]
  fn many_placeholders_fail_fast_on_long_input() {
    let p = NamingPattern::compile("{a}_{b}_{c}_{d}_{e}_{f}_{g}_{h}!").unwrap();
    let descriptor = "_".repeat(400);

    let started = std::time::Instant::now();
    assert!(!p.matches(&descriptor));
    assert!(started.elapsed() < std::time::Duration::from_secs(1), "{:?}", started.elapsed());

    assert!(p.matches("a_b_c_d_e_f_g_h!"));
  }

  #[test]
  fn multibyte_descriptors_split_on_char_boundaries() {
    let p = NamingPattern::compile("{asset}_é").unwrap();
    assert!(p.matches("ñandú_é"));
    assert!(!p.matches("_é"));
  }

  #[test]
  fn malformed_patterns_are_rejected() {
    assert!(NamingPattern::compile("ARC_{asset").is_err());
    assert!(NamingPattern::compile("ARC_asset}").is_err());
    assert!(NamingPattern::compile("ARC_{}").is_err());
    assert!(NamingPattern::compile("{a}{b}").is_err());
  }

  #[test]
  fn unknown_channel_fails_load() {
    let raw = RawPreset {
      naming:  None,
      packing: [("x".to_owned(), "height".to_owned())].into_iter().collect(),
    };
    let err = raw.into_preset("Acme".into()).unwrap_err();
    assert!(matches!(err, DataLoadError::UnknownChannel { .. }));
  }

  #[test]
  fn empty_naming_fails_load() {
    let raw = RawPreset { naming: Some(String::new()), packing: BTreeMap::new() };
    let err = raw.into_preset("Acme".into()).unwrap_err();
    assert!(matches!(err, DataLoadError::EmptyNamingPattern { .. }));
  }
}
