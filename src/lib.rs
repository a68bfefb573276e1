//! Property comfort service: profile-based comfort scoring over sensor
//! readings, plus the daily rollup that turns realtime readings into
//! historical averages.

pub mod api;
pub mod clock;
pub mod comfort;
pub mod config;
pub mod db;
pub mod rollup;
pub mod simulator;
pub mod store;
