// Engine domain models - the aggregate configuration and the structured
// verdicts handed back to collaborators (event listeners, admin commands,
// punishment dispatch).

use serde::{Deserialize, Serialize};

use crate::core::normalize::NormalizeConfig;
use crate::core::patterns::{MatchOrigin, PatternOptions};
use crate::core::ratelimit::{RateLimitConfig, ThrottleReason};

/// Everything the screening core needs, with defaults baked in. Supplied
/// fully resolved by the surrounding configuration layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub normalize: NormalizeConfig,
    pub patterns: PatternOptions,
    pub rate_limit: RateLimitConfig,
}

/// Result of screening one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed(AllowReason),
    Blocked(BlockReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowReason {
    /// An allow-list entry matched; screening stopped before the rate
    /// limiter and the block-list.
    Exempted { entry: String },
    /// Nothing matched.
    Clean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// The rate limiter blocked the message.
    RateLimit(ThrottleReason),
    /// A block-list entry matched the normalized input.
    Pattern {
        raw: String,
        matched: String,
        origin: MatchOrigin,
    },
}
