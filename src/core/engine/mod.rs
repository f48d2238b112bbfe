// Core engine module - screening orchestration over the other core parts.

pub mod engine_models;
pub mod engine_service;

pub use engine_models::{AllowReason, BlockReason, ModerationConfig, Verdict};
pub use engine_service::ModerationEngine;
