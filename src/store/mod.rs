//! Reading Store: the persistence seam shared by ingestion, the comfort
//! engine, the simulator and the rollup.
//!
//! [`postgres::PgReadingStore`] is the production backend;
//! [`memory::MemoryReadingStore`] keeps everything in process and backs
//! tests and database-less runs.

pub mod memory;
pub mod postgres;
mod seed;

#[cfg(test)]
pub(crate) mod flaky;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::db::models::{
    HistoricalReading, NewHistoricalReading, NewProperty, NewRealtimeReading, Property,
    RealtimeReading, SensorKind,
};

pub use memory::MemoryReadingStore;
pub use postgres::PgReadingStore;
pub use seed::seed_sample_properties;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store: database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store: migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Mean of the realtime values inside a window, with the number of rows
/// that went into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowAverage {
    pub mean: f64,
    pub samples: u64,
}

/// Transactional append/query/delete surface over realtime and historical
/// readings. Shared between the HTTP handlers and the background loops, so
/// implementations must be `Send + Sync`.
///
/// Time windows are half-open: `start <= recorded_at < end`.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// All properties, ordered by id.
    async fn properties(&self) -> Result<Vec<Property>>;

    async fn property(&self, id: i64) -> Result<Option<Property>>;

    async fn insert_property(&self, property: &NewProperty) -> Result<Property>;

    async fn insert_realtime(&self, reading: &NewRealtimeReading) -> Result<RealtimeReading>;

    /// Newest realtime reading for one property/sensor.
    async fn latest(&self, property_id: i64, kind: SensorKind) -> Result<Option<RealtimeReading>>;

    /// Realtime readings in the window, oldest first.
    async fn realtime_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RealtimeReading>>;

    /// `None` when the window holds no readings.
    async fn average_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WindowAverage>>;

    /// Daily averages on or after `since`, ordered by day ascending.
    async fn history(
        &self,
        property_id: i64,
        kinds: &[SensorKind],
        since: NaiveDate,
    ) -> Result<Vec<HistoricalReading>>;

    /// Writes every record or none of them.
    async fn insert_historical(&self, records: &[NewHistoricalReading]) -> Result<u64>;

    /// Deletes realtime readings of every property and sensor inside the
    /// window. Returns the number of rows removed.
    async fn delete_realtime_between(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<u64>;
}

pub type SharedStore = Arc<dyn ReadingStore>;
