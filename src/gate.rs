//! Provider availability gate: a small circuit breaker for the generative
//! service integration.
//!
//! Failures are classified by substring match against an explicit table.
//! Quota exhaustion trips the gate for 30 minutes, invalid credentials for
//! 60 minutes; anything else leaves the gate closed (the next request
//! simply retries). Expiry is lazy: the disabled-until timestamp is
//! compared against the clock on each `is_available` check, so no
//! background timer is needed.

use std::sync::Mutex;

use tracing::{info, warn};

use crate::util::now_epoch;

const QUOTA_COOLDOWN_SECS: u64 = 30 * 60;
const AUTH_COOLDOWN_SECS: u64 = 60 * 60;

/// Classification of a provider failure reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
  QuotaExceeded,
  AuthInvalid,
  Other,
}

// Matched case-insensitively, first hit wins.
const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "quota", "billing hard limit"];
const AUTH_MARKERS: &[&str] = &["invalid_api_key", "incorrect api key", "authentication", "unauthorized"];

/// Classify a failure reason string into a [`FailureClass`].
pub fn classify_failure(reason: &str) -> FailureClass {
  let lower = reason.to_lowercase();
  if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
    return FailureClass::QuotaExceeded;
  }
  if AUTH_MARKERS.iter().any(|m| lower.contains(m)) {
    return FailureClass::AuthInvalid;
  }
  FailureClass::Other
}

/// Clock abstraction so cooldown expiry is testable without sleeping.
pub trait Clock: Send + Sync {
  /// Unix seconds.
  fn now(&self) -> u64;
}

/// Wall-clock implementation used in production.
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> u64 {
    now_epoch()
  }
}

pub struct ProviderGate {
  clock: Box<dyn Clock>,
  disabled_until: Mutex<Option<u64>>,
}

impl ProviderGate {
  pub fn new() -> Self {
    Self::with_clock(Box::new(SystemClock))
  }

  pub fn with_clock(clock: Box<dyn Clock>) -> Self {
    Self { clock, disabled_until: Mutex::new(None) }
  }

  /// Record a failure and trip the gate if the reason warrants it.
  /// Returns the classification for the caller's logging.
  pub fn record_failure(&self, reason: &str) -> FailureClass {
    let class = classify_failure(reason);
    let cooldown = match class {
      FailureClass::QuotaExceeded => Some(QUOTA_COOLDOWN_SECS),
      FailureClass::AuthInvalid => Some(AUTH_COOLDOWN_SECS),
      FailureClass::Other => None,
    };

    match cooldown {
      Some(secs) => {
        let until = self.clock.now() + secs;
        *self.disabled_until.lock().expect("gate lock") = Some(until);
        warn!(target: "tutorforge_backend", ?class, cooldown_secs = secs, "Provider disabled after failure");
      }
      None => {
        info!(target: "tutorforge_backend", reason = %crate::util::trunc_for_log(reason, 120), "Provider failure without disablement");
      }
    }
    class
  }

  /// True when the provider may be called. Self-resets once the cooldown
  /// timestamp has passed.
  pub fn is_available(&self) -> bool {
    let mut guard = self.disabled_until.lock().expect("gate lock");
    match *guard {
      None => true,
      Some(until) => {
        if self.clock.now() >= until {
          *guard = None;
          info!(target: "tutorforge_backend", "Provider cooldown elapsed; gate reset");
          true
        } else {
          false
        }
      }
    }
  }
}

impl Default for ProviderGate {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU64, Ordering};
  use std::sync::Arc;

  struct ManualClock(Arc<AtomicU64>);

  impl Clock for ManualClock {
    fn now(&self) -> u64 {
      self.0.load(Ordering::SeqCst)
    }
  }

  fn gate_at(start: u64) -> (ProviderGate, Arc<AtomicU64>) {
    let t = Arc::new(AtomicU64::new(start));
    let gate = ProviderGate::with_clock(Box::new(ManualClock(t.clone())));
    (gate, t)
  }

  #[test]
  fn classification_table() {
    assert_eq!(classify_failure("insufficient_quota exceeded"), FailureClass::QuotaExceeded);
    assert_eq!(classify_failure("You exceeded your current QUOTA"), FailureClass::QuotaExceeded);
    assert_eq!(classify_failure("Invalid_api_key provided"), FailureClass::AuthInvalid);
    assert_eq!(classify_failure("401 Unauthorized"), FailureClass::AuthInvalid);
    assert_eq!(classify_failure("connection reset by peer"), FailureClass::Other);
  }

  #[test]
  fn quota_failure_disables_for_thirty_minutes() {
    let (gate, t) = gate_at(1_000);
    assert!(gate.is_available());

    gate.record_failure("insufficient_quota exceeded");
    assert!(!gate.is_available());

    t.store(1_000 + QUOTA_COOLDOWN_SECS - 1, Ordering::SeqCst);
    assert!(!gate.is_available());

    t.store(1_000 + QUOTA_COOLDOWN_SECS, Ordering::SeqCst);
    assert!(gate.is_available());
    // Lazy reset is sticky: still available without another failure.
    assert!(gate.is_available());
  }

  #[test]
  fn auth_failure_disables_for_an_hour() {
    let (gate, t) = gate_at(50_000);
    gate.record_failure("Incorrect API key provided");
    t.store(50_000 + QUOTA_COOLDOWN_SECS, Ordering::SeqCst);
    assert!(!gate.is_available(), "auth cooldown outlasts the quota window");
    t.store(50_000 + AUTH_COOLDOWN_SECS, Ordering::SeqCst);
    assert!(gate.is_available());
  }

  #[test]
  fn other_failures_do_not_trip_the_gate() {
    let (gate, _t) = gate_at(7);
    gate.record_failure("HTTP 500: upstream hiccup");
    assert!(gate.is_available());
  }
}
