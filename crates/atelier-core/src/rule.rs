//! Workflow rules: condition maps that contribute steps to a plan.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
  DataLoadError,
  request::{AttrKey, AttrValue, Request, TargetEngine},
};

/// A single `attribute == value` test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
  pub key:      AttrKey,
  pub expected: AttrValue,
}

impl Condition {
  pub fn holds(&self, request: &Request) -> bool {
    request.attribute(&self.key).as_ref() == Some(&self.expected)
  }
}

/// A rule in declared order. `index` is its position in `rules.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
  pub index:      usize,
  pub conditions: Vec<Condition>,
  pub steps:      Vec<String>,
  /// Optional routing hint, e.g. `"expedite"`.
  pub queue:      Option<String>,
}

impl Rule {
  /// Every condition holds. A rule with no conditions always matches.
  pub fn matches(&self, request: &Request) -> bool {
    self.conditions.iter().all(|c| c.holds(request))
  }

  /// The condition map as authored, for audit output.
  pub fn condition_map(&self) -> BTreeMap<String, AttrValue> {
    self
      .conditions
      .iter()
      .map(|c| {
        // Reported as text so the map reads back unchanged from JSON.
        let value = match &c.expected {
          AttrValue::Engine(engine) => AttrValue::Text(engine.to_string()),
          other => other.clone(),
        };
        (c.key.as_str().to_owned(), value)
      })
      .collect()
  }
}

impl Serialize for Rule {
  fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    RawRule {
      conditions: self.condition_map(),
      actions:    RawActions { steps: self.steps.clone(), queue: self.queue.clone() },
    }
    .serialize(s)
  }
}

// ─── Wire format ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawActions {
  #[serde(default)]
  pub steps: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub queue: Option<String>,
}

/// `{"if": {...}, "then": {"steps": [...], "queue": "..."}}`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawRule {
  #[serde(rename = "if", default)]
  pub conditions: BTreeMap<String, AttrValue>,
  #[serde(rename = "then")]
  pub actions:    RawActions,
}

impl RawRule {
  /// Type-check the condition map. `known` holds the custom attribute names
  /// carried by at least one request.
  pub(crate) fn into_rule(
    self,
    index: usize,
    known: &BTreeSet<&str>,
  ) -> Result<Rule, DataLoadError> {
    let mut conditions = Vec::with_capacity(self.conditions.len());

    for (name, value) in self.conditions {
      let key = AttrKey::parse(&name);
      let mismatch = || DataLoadError::RuleValueMismatch { rule: index, attribute: name.clone() };

      let expected = match (&key, value) {
        (AttrKey::Engine, AttrValue::Text(s)) => {
          AttrValue::Engine(s.parse::<TargetEngine>().map_err(|_| mismatch())?)
        }
        (AttrKey::Engine, _) => return Err(mismatch()),
        (AttrKey::Priority, v @ AttrValue::Flag(_)) => v,
        (AttrKey::Priority, _) => return Err(mismatch()),
        (AttrKey::Id | AttrKey::Account | AttrKey::Naming, v @ AttrValue::Text(_)) => v,
        (AttrKey::Id | AttrKey::Account | AttrKey::Naming, _) => return Err(mismatch()),
        (AttrKey::Custom(custom), v) => {
          if !known.contains(custom.as_str()) {
            return Err(DataLoadError::UnknownRuleAttribute {
              rule:      index,
              attribute: name.clone(),
            });
          }
          v
        }
      };
      conditions.push(Condition { key, expected });
    }

    Ok(Rule {
      index,
      conditions,
      steps: self.actions.steps,
      queue: self.actions.queue,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(json: &str) -> RawRule { serde_json::from_str(json).unwrap() }

  fn request(json: &str) -> Request { serde_json::from_str(json).unwrap() }

  #[test]
  fn engine_condition_is_typed_at_load() {
    let rule = raw(r#"{"if":{"engine":"unreal"},"then":{"steps":["export"]}}"#)
      .into_rule(0, &BTreeSet::new())
      .unwrap();

    assert!(rule.matches(&request(r#"{"id":"r","account":"A","engine":"Unreal"}"#)));
    assert!(!rule.matches(&request(r#"{"id":"r","account":"A","engine":"Unity"}"#)));
    assert_eq!(rule.condition_map()["engine"], AttrValue::Text("Unreal".into()));
  }

  #[test]
  fn empty_conditions_always_match() {
    let rule = raw(r#"{"if":{},"then":{"steps":["intake"]}}"#)
      .into_rule(3, &BTreeSet::new())
      .unwrap();
    assert!(rule.matches(&request(r#"{"id":"r","account":"A","engine":"Web"}"#)));
  }

  #[test]
  fn missing_custom_attribute_does_not_match() {
    let known = BTreeSet::from(["style"]);
    let rule = raw(r#"{"if":{"style":"pbr"},"then":{"steps":["s"]}}"#)
      .into_rule(0, &known)
      .unwrap();
    assert!(!rule.matches(&request(r#"{"id":"r","account":"A","engine":"Web"}"#)));
    assert!(rule.matches(&request(r#"{"id":"r","account":"A","engine":"Web","style":"pbr"}"#)));
  }

  #[test]
  fn unknown_attribute_fails_load() {
    let err = raw(r#"{"if":{"colour":"red"},"then":{"steps":[]}}"#)
      .into_rule(4, &BTreeSet::new())
      .unwrap_err();
    assert!(matches!(err, DataLoadError::UnknownRuleAttribute { rule: 4, .. }));
  }

  #[test]
  fn wrongly_typed_builtin_fails_load() {
    let err = raw(r#"{"if":{"priority":"yes"},"then":{"steps":[]}}"#)
      .into_rule(1, &BTreeSet::new())
      .unwrap_err();
    assert!(matches!(err, DataLoadError::RuleValueMismatch { rule: 1, .. }));

    let err = raw(r#"{"if":{"engine":"Source2"},"then":{"steps":[]}}"#)
      .into_rule(2, &BTreeSet::new())
      .unwrap_err();
    assert!(matches!(err, DataLoadError::RuleValueMismatch { rule: 2, .. }));
  }

  #[test]
  fn serializes_back_to_wire_shape() {
    let rule = raw(r#"{"if":{"priority":true},"then":{"steps":["qa"],"queue":"expedite"}}"#)
      .into_rule(1, &BTreeSet::new())
      .unwrap();
    let json = serde_json::to_value(&rule).unwrap();
    assert_eq!(
      json,
      serde_json::json!({"if":{"priority":true},"then":{"steps":["qa"],"queue":"expedite"}})
    );
  }
}
