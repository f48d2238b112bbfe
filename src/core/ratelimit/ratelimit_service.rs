// Rate limiter - per-actor repeat detection and slowmode state machine.
//
// Each actor owns an independent state machine: Normal, or Slowmode(until).
// State is sharded by actor id in a DashMap, with one exclusive lock per
// record, so actors sending concurrently never contend with each other.
//
// All timestamps are caller-supplied millisecond values; the service itself
// never reads the clock, which keeps every transition testable.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use super::ratelimit_models::{ActorState, RateLimitConfig, ThrottleDecision, ThrottleReason};

pub struct RateLimiter {
    config: RateLimitConfig,
    states: DashMap<u64, Arc<Mutex<ActorState>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    /// Fetch the actor's state handle without holding the map shard while
    /// the state itself is locked.
    fn state_handle(&self, actor_id: u64) -> Arc<Mutex<ActorState>> {
        let entry = self.states.entry(actor_id).or_default();
        Arc::clone(entry.value())
    }

    /// Run one message through the actor's state machine.
    ///
    /// Transitions, in order: an elapsed slowmode window expires; an active
    /// slowmode window blocks with `Cooldown` when not enough time has
    /// passed since the last allowed message (the message is still recorded
    /// as last-seen so spam during cooldown cannot reset detection); an
    /// identical message inside the repeat window advances the repeat
    /// count; reaching the threshold starts a new slowmode window and
    /// blocks with `Triggered`; anything else is allowed and stamped as the
    /// last allowed message.
    pub fn evaluate(
        &self,
        actor_id: u64,
        normalized: &str,
        now_millis: i64,
    ) -> ThrottleDecision {
        if !self.config.enabled {
            return ThrottleDecision::Allow;
        }

        let handle = self.state_handle(actor_id);
        let mut state = handle.lock().unwrap_or_else(PoisonError::into_inner);

        if state.slowmode_until > 0 && now_millis >= state.slowmode_until {
            state.slowmode_until = 0;
        }

        let cooldown_millis = seconds_to_millis(self.config.slowmode_cooldown_seconds);
        if state.slowmode_until > now_millis && cooldown_millis > 0 && state.last_allowed_at > 0 {
            let since_allowed = now_millis - state.last_allowed_at;
            if since_allowed < cooldown_millis {
                let remaining = cooldown_millis - since_allowed;
                let remaining_seconds = (remaining + 999) / 1000;
                state.last_message_at = now_millis;
                state.last_normalized = Some(normalized.to_string());
                return ThrottleDecision::Block(ThrottleReason::Cooldown {
                    remaining_seconds: remaining_seconds.max(1) as u64,
                });
            }
        }

        let window_millis = seconds_to_millis(self.config.repeat_window_seconds);
        if state.last_normalized.as_deref() == Some(normalized)
            && (now_millis - state.last_message_at) <= window_millis
        {
            state.repeat_count += 1;
        } else {
            state.repeat_count = 1;
        }
        state.last_message_at = now_millis;
        state.last_normalized = Some(normalized.to_string());

        let threshold = self.config.repeat_threshold.max(1);
        let duration_millis = seconds_to_millis(self.config.slowmode_duration_seconds);
        if duration_millis > 0 && state.repeat_count >= threshold {
            state.repeat_count = 0;
            state.slowmode_until = now_millis + duration_millis;
            state.last_allowed_at = 0;
            return ThrottleDecision::Block(ThrottleReason::Triggered {
                duration_seconds: self.config.slowmode_duration_seconds.max(1),
                cooldown_seconds: self.config.slowmode_cooldown_seconds.max(1),
            });
        }

        state.last_allowed_at = now_millis;
        ThrottleDecision::Allow
    }

    /// Force-end an actor's slowmode and reset counters. Returns whether a
    /// slowmode window was actually active.
    pub fn clear(&self, actor_id: u64, now_millis: i64) -> bool {
        let handle = match self.states.get(&actor_id) {
            Some(entry) => Arc::clone(entry.value()),
            None => return false,
        };
        let mut state = handle.lock().unwrap_or_else(PoisonError::into_inner);
        let active = state.slowmode_until > now_millis;
        state.slowmode_until = 0;
        state.repeat_count = 0;
        state.last_allowed_at = 0;
        active
    }
}

fn seconds_to_millis(seconds: u64) -> i64 {
    i64::try_from(seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
}

// ============================================================================
// TESTS
// ============================================================================
