//! Time-series rollup: closes each GMT+8 day by averaging its realtime
//! readings into historical rows and purging the source rows.

pub mod migration;
pub mod scheduler;

pub use migration::{migrate_day, MigrationError, MigrationReport};
pub use scheduler::{DayCursor, RollupScheduler, SchedulerState};
