// Moderation engine - orchestrates one screening pass per inbound string.
//
// Pipeline per input: normalize once, then allow-list, then rate limiter,
// then block-list; the first stage to decide short-circuits. The ordering
// is a hard contract: an allow-list hit overrides both rate limiting and
// pattern blocking.
//
// The engine holds no transport concerns; callers invoke it per chat
// message or per login attempt and act on the returned verdict.

use std::sync::Arc;

use chrono::Utc;

use super::engine_models::{AllowReason, BlockReason, ModerationConfig, Verdict};
use crate::core::normalize::Normalizer;
use crate::core::patterns::{PatternError, PatternSource, PatternStore, ReloadOutcome};
use crate::core::ratelimit::{RateLimiter, ThrottleDecision};

pub struct ModerationEngine<S: PatternSource> {
    normalizer: Arc<Normalizer>,
    blocklist: Arc<PatternStore<S>>,
    allowlist: Arc<PatternStore<S>>,
    limiter: RateLimiter,
}

impl<S: PatternSource> ModerationEngine<S> {
    pub fn new(
        normalizer: Arc<Normalizer>,
        blocklist: Arc<PatternStore<S>>,
        allowlist: Arc<PatternStore<S>>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            normalizer,
            blocklist,
            allowlist,
            limiter,
        }
    }

    /// Wire up an engine from its aggregate config and two backing sources.
    /// The stores start empty; call [`load`](Self::load) before screening.
    pub fn from_config(config: ModerationConfig, block_source: S, allow_source: S) -> Self {
        let normalizer = Arc::new(Normalizer::new(config.normalize));
        let blocklist = Arc::new(PatternStore::new(
            "blocklist",
            block_source,
            Arc::clone(&normalizer),
            config.patterns.clone(),
        ));
        let allowlist = Arc::new(PatternStore::new(
            "allowlist",
            allow_source,
            Arc::clone(&normalizer),
            config.patterns,
        ));
        Self::new(normalizer, blocklist, allowlist, RateLimiter::new(config.rate_limit))
    }

    /// Load both stores from their sources.
    pub async fn load(&self) -> Result<(ReloadOutcome, ReloadOutcome), PatternError> {
        let block = self.blocklist.reload().await?;
        let allow = self.allowlist.reload().await?;
        Ok((block, allow))
    }

    /// Screen one chat message from `actor_id`.
    pub fn evaluate_chat(&self, actor_id: u64, raw: &str) -> Verdict {
        self.evaluate_chat_at(actor_id, raw, Utc::now().timestamp_millis())
    }

    /// Clock-explicit variant of [`evaluate_chat`](Self::evaluate_chat).
    pub fn evaluate_chat_at(&self, actor_id: u64, raw: &str, now_millis: i64) -> Verdict {
        let normalized = self.normalizer.normalize(raw);

        if let Some(entry) = self.allowlist.find_exempt_match(&normalized, raw) {
            return Verdict::Allowed(AllowReason::Exempted { entry });
        }

        if let ThrottleDecision::Block(reason) =
            self.limiter.evaluate(actor_id, &normalized, now_millis)
        {
            return Verdict::Blocked(BlockReason::RateLimit(reason));
        }

        if let Some(hit) = self.blocklist.find_match(&normalized) {
            return Verdict::Blocked(BlockReason::Pattern {
                raw: hit.raw,
                matched: hit.matched,
                origin: hit.origin,
            });
        }

        Verdict::Allowed(AllowReason::Clean)
    }

    /// Screen a player-chosen name at login. Same pipeline minus the rate
    /// limiter: names arrive once per login, not in a stream.
    pub fn screen_name(&self, raw: &str) -> Verdict {
        let normalized = self.normalizer.normalize(raw);

        if let Some(entry) = self.allowlist.find_exempt_match(&normalized, raw) {
            return Verdict::Allowed(AllowReason::Exempted { entry });
        }

        if let Some(hit) = self.blocklist.find_match(&normalized) {
            return Verdict::Blocked(BlockReason::Pattern {
                raw: hit.raw,
                matched: hit.matched,
                origin: hit.origin,
            });
        }

        Verdict::Allowed(AllowReason::Clean)
    }

    /// Force-end an actor's slowmode (admin action). Returns whether one
    /// was active.
    pub fn clear_slowmode(&self, actor_id: u64) -> bool {
        self.limiter
            .clear(actor_id, Utc::now().timestamp_millis())
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// The block-list store, for live administration (append/remove/reload).
    pub fn blocklist(&self) -> &PatternStore<S> {
        &self.blocklist
    }

    /// The allow-list store, for live administration (append/remove/reload).
    pub fn allowlist(&self) -> &PatternStore<S> {
        &self.allowlist
    }
}

// ============================================================================
// TESTS
// ============================================================================
