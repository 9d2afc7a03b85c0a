use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

const SENTINELS: [&str; 3] = ["none", "unknown", "unavailable"];

/// True for face-sensor values that mean "nobody recognized".
pub fn is_sentinel(identity: &str) -> bool {
    let trimmed = identity.trim();
    trimmed.is_empty() || SENTINELS.iter().any(|s| trimmed.eq_ignore_ascii_case(s))
}

/// Last proactive greeting per recognized person.
///
/// Entries are only created by a greeting and are never evicted. Not
/// synchronized: the owner must serialize access.
#[derive(Debug, Clone)]
pub struct IdentityCooldownTracker {
    hold_off: TimeDelta,
    last_greeted: HashMap<String, DateTime<Utc>>,
}

impl IdentityCooldownTracker {
    pub fn new(hold_off: TimeDelta) -> Self {
        Self {
            hold_off,
            last_greeted: HashMap::new(),
        }
    }

    pub fn hold_off(&self) -> TimeDelta {
        self.hold_off
    }

    pub fn is_eligible(&self, identity: &str, now: DateTime<Utc>) -> bool {
        if is_sentinel(identity) {
            return false;
        }
        match self.last_greeted.get(identity) {
            None => true,
            Some(last) => now - *last >= self.hold_off,
        }
    }

    /// Time left before `identity` may be greeted again, if any.
    pub fn remaining(&self, identity: &str, now: DateTime<Utc>) -> Option<TimeDelta> {
        let last = self.last_greeted.get(identity)?;
        let left = self.hold_off - (now - *last);
        (left > TimeDelta::zero()).then_some(left)
    }

    pub fn record_greeting(&mut self, identity: &str, now: DateTime<Utc>) {
        if is_sentinel(identity) {
            return;
        }
        self.last_greeted.insert(identity.to_string(), now);
    }

    pub fn last_greeted(&self, identity: &str) -> Option<DateTime<Utc>> {
        self.last_greeted.get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.last_greeted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_greeted.is_empty()
    }
}

impl Default for IdentityCooldownTracker {
    fn default() -> Self {
        Self::new(TimeDelta::minutes(crate::consts::HOLD_OFF_TIME_MINUTES))
    }
}
