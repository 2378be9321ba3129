//! Injected clock — keeps the pipeline pure and testable.
//!
//! Every timestamp a run stamps (`effective_from`, `effective_to`) comes from
//! one `now()` call at the start of merge application, so all three merge
//! operations of a run share a single transition instant.

use chrono::{DateTime, Utc};

/// Source of the run's transition timestamp.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock pinned to one instant; for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> { self.0 }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn fixed_clock_returns_its_instant() {
    let at = Utc.timestamp_opt(1_000_000, 0).unwrap();
    assert_eq!(FixedClock(at).now(), at);
  }
}
