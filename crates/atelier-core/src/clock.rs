//! Time source capability. Injected so recording timestamps and decision id
//! buckets can be pinned in tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
  pub fn new(at: DateTime<Utc>) -> Self { Self(Mutex::new(at)) }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = at;
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    *self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
  }
}
