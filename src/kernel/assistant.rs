use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Idle longer than this (seconds) before `listening` means the user woke the device.
pub const LONG_IDLE_SECS: i64 = 10;

/// Observed state of the voice assistant satellite.
/// Values outside the known cycle pass through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssistantState {
    Idle,
    Listening,
    Processing,
    Responding,
    Other(String),
}

impl AssistantState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idle" => Self::Idle,
            "listening" => Self::Listening,
            "processing" => Self::Processing,
            "responding" => Self::Responding,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Responding => "responding",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl From<String> for AssistantState {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<AssistantState> for String {
    fn from(state: AssistantState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for AssistantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Long idle followed by listening: the user most likely spoke first.
    LikelyUserInitiated { idle_for: TimeDelta },
    Other,
}

/// Interprets satellite transitions.
///
/// The satellite cycles through two conversation shapes:
///
/// ```text
/// user initiated:    idle (long)  -> listening -> processing -> responding   [repeat]
/// system initiated:  idle -> responding -> idle (short) -> listening -> processing -> responding   [repeat]
/// ```
///
/// | from        | to          | shape                      |
/// |-------------|-------------|----------------------------|
/// | idle        | listening   | both (long idle = user)    |
/// | idle        | responding  | system initiated           |
/// | listening   | processing  | both                       |
/// | processing  | responding  | both                       |
/// | responding  | idle        | both                       |
/// | responding  | listening   | both (follow-up turn)      |
///
/// Anything else is tolerated and reported as [`TransitionKind::Other`].
pub struct ActivityClassifier;

impl ActivityClassifier {
    /// Pure function: (old state, when it was entered, new state, now) -> kind.
    pub fn classify_transition(
        old_state: &AssistantState,
        old_entered_at: DateTime<Utc>,
        new_state: &AssistantState,
        now: DateTime<Utc>,
    ) -> TransitionKind {
        use AssistantState::*;

        match (old_state, new_state) {
            (Idle, Listening) => {
                let idle_for = now - old_entered_at;
                if idle_for > TimeDelta::seconds(LONG_IDLE_SECS) {
                    TransitionKind::LikelyUserInitiated { idle_for }
                } else {
                    TransitionKind::Other
                }
            }
            _ => TransitionKind::Other,
        }
    }

    /// Whether `from -> to` belongs to one of the known conversation shapes.
    pub fn is_conversation_step(from: &AssistantState, to: &AssistantState) -> bool {
        use AssistantState::*;

        matches!(
            (from, to),
            (Idle, Listening)
                | (Idle, Responding)
                | (Listening, Processing)
                | (Processing, Responding)
                | (Responding, Idle)
                | (Responding, Listening)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn classify(old: &str, idle_secs: i64, new: &str) -> TransitionKind {
        ActivityClassifier::classify_transition(
            &AssistantState::parse(old),
            now() - TimeDelta::seconds(idle_secs),
            &AssistantState::parse(new),
            now(),
        )
    }

    #[test]
    fn long_idle_to_listening_is_user_initiated() {
        assert_eq!(
            classify("idle", 11, "listening"),
            TransitionKind::LikelyUserInitiated { idle_for: TimeDelta::seconds(11) }
        );
        assert!(matches!(
            classify("idle", 3600, "listening"),
            TransitionKind::LikelyUserInitiated { .. }
        ));
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(classify("idle", 10, "listening"), TransitionKind::Other);
        assert_eq!(classify("idle", 2, "listening"), TransitionKind::Other);
        let just_over = ActivityClassifier::classify_transition(
            &AssistantState::Idle,
            now() - TimeDelta::seconds(10) - TimeDelta::milliseconds(1),
            &AssistantState::Listening,
            now(),
        );
        assert!(matches!(just_over, TransitionKind::LikelyUserInitiated { .. }));
    }

    #[test]
    fn other_pairs_are_other() {
        assert_eq!(classify("idle", 60, "responding"), TransitionKind::Other);
        assert_eq!(classify("responding", 60, "listening"), TransitionKind::Other);
        assert_eq!(classify("listening", 60, "processing"), TransitionKind::Other);
        assert_eq!(classify("unavailable", 60, "listening"), TransitionKind::Other);
        assert_eq!(classify("idle", 60, "muted"), TransitionKind::Other);
    }

    #[test]
    fn parse_is_case_insensitive_and_passes_through_unknowns() {
        assert_eq!(AssistantState::parse("Idle"), AssistantState::Idle);
        assert_eq!(AssistantState::parse("LISTENING"), AssistantState::Listening);
        let other = AssistantState::parse("unavailable");
        assert_eq!(other, AssistantState::Other("unavailable".into()));
        assert_eq!(other.to_string(), "unavailable");
    }

    #[test]
    fn transition_table() {
        use AssistantState::*;
        assert!(ActivityClassifier::is_conversation_step(&Idle, &Responding));
        assert!(ActivityClassifier::is_conversation_step(&Processing, &Responding));
        assert!(!ActivityClassifier::is_conversation_step(&Listening, &Responding));
        assert!(!ActivityClassifier::is_conversation_step(&Idle, &Other("x".into())));
    }
}
