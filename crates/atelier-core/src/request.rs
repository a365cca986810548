//! Production requests and the typed attribute view rules match against.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ─── Target engine ───────────────────────────────────────────────────────────

/// The runtime an asset is delivered for.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(try_from = "String", into = "String")]
pub enum TargetEngine {
  Unreal,
  Unity,
  Godot,
  Blender,
  Web,
}

impl TryFrom<String> for TargetEngine {
  type Error = strum::ParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<TargetEngine> for String {
  fn from(engine: TargetEngine) -> Self { engine.to_string() }
}

impl TargetEngine {
  /// The skill name an artist needs to deliver for this engine.
  pub fn skill(self) -> String { self.to_string().to_lowercase() }
}

// ─── Attribute values ────────────────────────────────────────────────────────

/// A comparable attribute value. Free-form request attributes and rule
/// condition values both deserialise into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
  Flag(bool),
  Int(i64),
  Text(String),
  #[serde(skip_deserializing)]
  Engine(TargetEngine),
}

impl AttrValue {
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }
}

/// The name of an attribute a rule condition can reference.
///
/// Built-in fields resolve through [`Request::attribute`]; everything else is
/// looked up in the request's free-form attribute map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrKey {
  Id,
  Account,
  Naming,
  Engine,
  Priority,
  Custom(String),
}

impl AttrKey {
  pub fn parse(name: &str) -> Self {
    match name {
      "id" => Self::Id,
      "account" => Self::Account,
      "naming" => Self::Naming,
      "engine" => Self::Engine,
      "priority" => Self::Priority,
      other => Self::Custom(other.to_owned()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Id => "id",
      Self::Account => "account",
      Self::Naming => "naming",
      Self::Engine => "engine",
      Self::Priority => "priority",
      Self::Custom(name) => name,
    }
  }
}

// ─── Request ─────────────────────────────────────────────────────────────────

/// An incoming production request. Loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRequest")]
pub struct Request {
  pub id:              String,
  /// Account key; resolves to a [`Preset`](crate::preset::Preset) when one
  /// exists.
  pub account:         String,
  /// Asset naming descriptor checked against the preset's naming pattern.
  pub naming:          Option<String>,
  pub engine:          TargetEngine,
  /// Lower-cased skill names an assigned artist must hold.
  pub required_skills: BTreeSet<String>,
  pub priority:        bool,
  #[serde(flatten)]
  pub attributes:      BTreeMap<String, AttrValue>,
}

impl Request {
  /// Resolve `key` against this request. Returns `None` for an optional field
  /// or custom attribute the request does not carry.
  pub fn attribute(&self, key: &AttrKey) -> Option<AttrValue> {
    match key {
      AttrKey::Id => Some(AttrValue::Text(self.id.clone())),
      AttrKey::Account => Some(AttrValue::Text(self.account.clone())),
      AttrKey::Naming => self.naming.clone().map(AttrValue::Text),
      AttrKey::Engine => Some(AttrValue::Engine(self.engine)),
      AttrKey::Priority => Some(AttrValue::Flag(self.priority)),
      AttrKey::Custom(name) => self.attributes.get(name).cloned(),
    }
  }
}

/// Wire shape of a request. Unknown keys land in `attributes`.
#[derive(Deserialize)]
struct RawRequest {
  id:              String,
  account:         String,
  #[serde(default)]
  naming:          Option<String>,
  engine:          TargetEngine,
  #[serde(default)]
  required_skills: Option<Vec<String>>,
  #[serde(default)]
  priority:        bool,
  #[serde(flatten)]
  attributes:      BTreeMap<String, AttrValue>,
}

impl From<RawRequest> for Request {
  fn from(raw: RawRequest) -> Self {
    // Without an explicit list the skills come from style, engine and
    // topology, in that order.
    let required_skills = match raw.required_skills {
      Some(skills) => skills.iter().map(|s| s.to_lowercase()).collect(),
      None => {
        let style = raw.attributes.get("style").and_then(AttrValue::as_text);
        let topology = raw.attributes.get("topology").and_then(AttrValue::as_text);
        style
          .map(str::to_lowercase)
          .into_iter()
          .chain(Some(raw.engine.skill()))
          .chain(topology.map(str::to_lowercase))
          .collect()
      }
    };

    Self {
      id: raw.id,
      account: raw.account,
      naming: raw.naming,
      engine: raw.engine,
      required_skills,
      priority: raw.priority,
      attributes: raw.attributes,
    }
  }
}
