//! Rule-driven redaction of sensitive values.
//!
//! A [`MaskingEngine`] walks a JSON value tree and, for every object key,
//! applies the first [`MaskingRule`] whose pattern matches. Unmatched
//! containers are traversed; string leaves holding absolute URLs have
//! matching query parameters masked in place.

mod defaults;
mod engine;
mod rule;
mod strategy;

pub use defaults::default_rules;
pub use engine::{MaskingEngine, DEFAULT_MASK_CHAR, DEFAULT_MAX_DEPTH, TRUNCATED};
pub use rule::{KeyPattern, MaskingRule};
pub use strategy::{
    CustomMask, MaskStrategy, StrategyParams, FULL_MASK_WIDTH, PASSWORD_MASK_WIDTH,
};
