// chatguard - screening core for chat messages and player-chosen names.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic): normalization pipeline,
//   pattern stores, rate limiter, moderation engine
// - `infra/` = Implementations of core traits (file-backed pattern sources)
//
// The surrounding layer (event delivery, punishment dispatch, audit
// logging, localized messages, admin commands) calls `ModerationEngine`
// synchronously per inbound string and acts on the returned verdict.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

pub use crate::core::engine::{AllowReason, BlockReason, ModerationConfig, ModerationEngine, Verdict};
pub use crate::core::normalize::{NormalizeConfig, Normalizer};
pub use crate::core::patterns::{
    MatchOrigin, PatternError, PatternMatch, PatternOptions, PatternSnapshot, PatternSource,
    PatternStore, ReloadOutcome,
};
pub use crate::core::ratelimit::{RateLimitConfig, RateLimiter, ThrottleDecision, ThrottleReason};
pub use crate::infra::patterns::{FilePatternSource, InMemoryPatternSource};
