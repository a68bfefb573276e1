//! Comfort Scoring Engine.
//!
//! Turns raw sensor values plus a profile definition into per-sensor
//! scores, a weighted overall score, a qualitative level and insights.

pub mod evaluator;
pub mod profiles;
pub mod scoring;

pub use evaluator::ComfortEvaluator;
pub use profiles::{normalize_profile, Profile, SensorPreference};
pub use scoring::{ComfortLevel, PropertyComfortResult, SensorEvaluation, SensorStatus};
