// Core rate limiting module - per-actor slowmode business logic.
// Following the same pattern as the patterns module.

pub mod ratelimit_models;
pub mod ratelimit_service;

pub use ratelimit_models::{RateLimitConfig, ThrottleDecision, ThrottleReason};
pub use ratelimit_service::RateLimiter;
