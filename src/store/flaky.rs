use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{MemoryReadingStore, ReadingStore, Result, StoreError, WindowAverage};
use crate::db::models::{
    HistoricalReading, NewHistoricalReading, NewProperty, NewRealtimeReading, Property,
    RealtimeReading, SensorKind,
};

/// Memory store with switchable write and delete failures.
pub struct FlakyStore {
    inner: MemoryReadingStore,
    fail_write: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: MemoryReadingStore) -> Self {
        Self {
            inner,
            fail_write: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_write.store(on, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, on: bool) {
        self.fail_delete.store(on, Ordering::SeqCst);
    }
}

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl ReadingStore for FlakyStore {
    async fn properties(&self) -> Result<Vec<Property>> {
        self.inner.properties().await
    }

    async fn property(&self, id: i64) -> Result<Option<Property>> {
        self.inner.property(id).await
    }

    async fn insert_property(&self, property: &NewProperty) -> Result<Property> {
        self.inner.insert_property(property).await
    }

    async fn insert_realtime(&self, reading: &NewRealtimeReading) -> Result<RealtimeReading> {
        self.inner.insert_realtime(reading).await
    }

    async fn latest(&self, property_id: i64, kind: SensorKind) -> Result<Option<RealtimeReading>> {
        self.inner.latest(property_id, kind).await
    }

    async fn realtime_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RealtimeReading>> {
        self.inner.realtime_between(property_id, kind, start, end).await
    }

    async fn average_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WindowAverage>> {
        self.inner.average_between(property_id, kind, start, end).await
    }

    async fn history(
        &self,
        property_id: i64,
        kinds: &[SensorKind],
        since: NaiveDate,
    ) -> Result<Vec<HistoricalReading>> {
        self.inner.history(property_id, kinds, since).await
    }

    async fn insert_historical(&self, records: &[NewHistoricalReading]) -> Result<u64> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.insert_historical(records).await
    }

    async fn delete_realtime_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.delete_realtime_between(start, end).await
    }
}
