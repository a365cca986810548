//! Preset validation: naming policy and four-channel texture packing.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

use crate::{dataset::Dataset, preset::Channel, request::Request};

/// Outcome of validating a request's preset. Errors are in evaluation order:
/// naming first, then missing channels in r, g, b, a order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
  pub ok:     bool,
  pub errors: Vec<String>,
}

impl Validation {
  fn from_errors(errors: Vec<String>) -> Self { Self { ok: errors.is_empty(), errors } }
}

pub const INVALID_NAMING: &str = "Invalid naming configuration";

pub fn no_preset_error(account: &str) -> String {
  format!("No preset found for account: {account}")
}

pub fn missing_channel_error(channel: Channel) -> String {
  format!("Missing required texture channel: '{channel}'")
}

/// Check `request` against its account's preset.
pub fn validate(dataset: &Dataset, request: &Request) -> Validation {
  let Some(preset) = dataset.preset_by_account(&request.account) else {
    return Validation::from_errors(vec![no_preset_error(&request.account)]);
  };

  let mut errors = Vec::new();

  if let Some(pattern) = &preset.naming {
    let satisfied = request.naming.as_deref().is_some_and(|n| pattern.matches(n));
    if !satisfied {
      errors.push(INVALID_NAMING.to_owned());
    }
  }

  let present = preset.channels();
  errors.extend(
    Channel::iter()
      .filter(|c| !present.contains(c))
      .map(missing_channel_error),
  );

  Validation::from_errors(errors)
}
