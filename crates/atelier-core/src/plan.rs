//! Rule matching: derive a request's ordered workflow steps.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{dataset::Dataset, request::AttrValue, request::Request};

/// One matched rule, kept for the audit trace even when every step it
/// contributes was already present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRule {
  pub rule_index: usize,
  pub conditions: BTreeMap<String, AttrValue>,
  pub steps:      Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub queue:      Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
  /// Unique steps; the first rule to introduce a step fixes its position.
  pub steps:         Vec<String>,
  pub matched_rules: Vec<MatchedRule>,
  /// First queue hint among the matched rules, in rule order.
  #[serde(default)]
  pub queue:         Option<String>,
}

/// Evaluate every rule in declared order against `request`.
///
/// Zero matches yields an empty plan, which is a valid outcome.
pub fn plan(dataset: &Dataset, request: &Request) -> Plan {
  let mut out = Plan::default();
  let mut seen = HashSet::new();

  for rule in dataset.rules_all().iter().filter(|r| r.matches(request)) {
    for step in &rule.steps {
      if seen.insert(step.as_str()) {
        out.steps.push(step.clone());
      }
    }
    if out.queue.is_none() {
      out.queue.clone_from(&rule.queue);
    }
    out.matched_rules.push(MatchedRule {
      rule_index: rule.index,
      conditions: rule.condition_map(),
      steps:      rule.steps.clone(),
      queue:      rule.queue.clone(),
    });
  }

  out
}
