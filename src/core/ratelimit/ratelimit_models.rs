// Rate limiting domain models - per-actor repeat detection state and the
// decisions the limiter hands back to the engine.
//
// These are pure domain types with no transport dependencies; the
// surrounding layer turns decisions into user-facing messages.

use serde::{Deserialize, Serialize};

/// Configuration for repeat detection and slowmode escalation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting runs at all.
    pub enabled: bool,
    /// Two identical messages within this window count as a repeat.
    pub repeat_window_seconds: u64,
    /// Repeats needed to trigger slowmode.
    pub repeat_threshold: u32,
    /// How long a triggered slowmode lasts.
    pub slowmode_duration_seconds: u64,
    /// Minimum gap between allowed messages while in slowmode.
    pub slowmode_cooldown_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repeat_window_seconds: 15,
            repeat_threshold: 2,
            slowmode_duration_seconds: 60,
            slowmode_cooldown_seconds: 10,
        }
    }
}

/// Outcome of evaluating one message against an actor's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allow,
    Block(ThrottleReason),
}

impl ThrottleDecision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, ThrottleDecision::Block(_))
    }
}

/// Why a message was throttled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleReason {
    /// The repeat threshold was just reached; a slowmode window started.
    Triggered {
        duration_seconds: u64,
        cooldown_seconds: u64,
    },
    /// An active slowmode window requires more time since the last allowed
    /// message. `remaining_seconds` is rounded up and at least 1.
    Cooldown { remaining_seconds: u64 },
}

/// Mutable per-actor record. Created lazily on the first message from an
/// actor and mutated only under that actor's own lock.
#[derive(Debug, Default)]
pub(crate) struct ActorState {
    pub last_normalized: Option<String>,
    pub last_message_at: i64,
    pub last_allowed_at: i64,
    pub slowmode_until: i64,
    pub repeat_count: u32,
}
