// Core patterns module - the dual literal/regex match store used for both
// the block-list and the allow-list.

pub mod pattern_models;
pub mod pattern_store;

pub use pattern_models::{
    CompiledEntry, MatchOrigin, PatternError, PatternMatch, PatternOptions, PatternSnapshot,
    ReloadOutcome,
};
pub use pattern_store::{PatternSource, PatternStore};
