use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ReadingStore, Result, WindowAverage};
use crate::db::models::{
    HistoricalReading, NewHistoricalReading, NewProperty, NewRealtimeReading, Property,
    RealtimeReading, SensorKind,
};

/// In-process Reading Store.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Every operation takes the lock once, which makes multi-row writes atomic
/// with respect to readers.
#[derive(Clone, Default)]
pub struct MemoryReadingStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    next_property_id: i64,
    properties: Vec<Property>,
    realtime: Vec<RealtimeReading>,
    historical: Vec<HistoricalReading>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_window(r: &RealtimeReading, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    r.recorded_at >= start && r.recorded_at < end
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn properties(&self) -> Result<Vec<Property>> {
        let mut all = self.inner.read().await.properties.clone();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn property(&self, id: i64) -> Result<Option<Property>> {
        Ok(self
            .inner
            .read()
            .await
            .properties
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn insert_property(&self, property: &NewProperty) -> Result<Property> {
        let mut tables = self.inner.write().await;
        tables.next_property_id += 1;
        let stored = Property {
            id: tables.next_property_id,
            name: property.name.clone(),
            address: property.address.clone(),
            description: property.description.clone(),
            image_url: property.image_url.clone(),
        };
        tables.properties.push(stored.clone());
        Ok(stored)
    }

    async fn insert_realtime(&self, reading: &NewRealtimeReading) -> Result<RealtimeReading> {
        let stored = RealtimeReading {
            id: Uuid::new_v4(),
            property_id: reading.property_id,
            sensor_kind: reading.sensor_kind,
            value: reading.value,
            recorded_at: reading.recorded_at,
        };
        self.inner.write().await.realtime.push(stored.clone());
        Ok(stored)
    }

    async fn latest(&self, property_id: i64, kind: SensorKind) -> Result<Option<RealtimeReading>> {
        Ok(self
            .inner
            .read()
            .await
            .realtime
            .iter()
            .filter(|r| r.property_id == property_id && r.sensor_kind == kind)
            .max_by_key(|r| r.recorded_at)
            .cloned())
    }

    async fn realtime_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RealtimeReading>> {
        let mut rows: Vec<_> = self
            .inner
            .read()
            .await
            .realtime
            .iter()
            .filter(|r| r.property_id == property_id && r.sensor_kind == kind)
            .filter(|r| in_window(r, start, end))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.recorded_at);
        Ok(rows)
    }

    async fn average_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WindowAverage>> {
        let tables = self.inner.read().await;
        let (sum, samples) = tables
            .realtime
            .iter()
            .filter(|r| r.property_id == property_id && r.sensor_kind == kind)
            .filter(|r| in_window(r, start, end))
            .fold((0.0, 0u64), |(sum, n), r| (sum + r.value, n + 1));

        Ok((samples > 0).then(|| WindowAverage {
            mean: sum / samples as f64,
            samples,
        }))
    }

    async fn history(
        &self,
        property_id: i64,
        kinds: &[SensorKind],
        since: NaiveDate,
    ) -> Result<Vec<HistoricalReading>> {
        let mut rows: Vec<_> = self
            .inner
            .read()
            .await
            .historical
            .iter()
            .filter(|h| h.property_id == property_id)
            .filter(|h| kinds.contains(&h.sensor_kind) && h.day >= since)
            .cloned()
            .collect();
        // Stable: duplicates for one day keep insertion order.
        rows.sort_by_key(|h| h.day);
        Ok(rows)
    }

    async fn insert_historical(&self, records: &[NewHistoricalReading]) -> Result<u64> {
        let mut tables = self.inner.write().await;
        tables
            .historical
            .extend(records.iter().map(|r| HistoricalReading {
                id: Uuid::new_v4(),
                property_id: r.property_id,
                sensor_kind: r.sensor_kind,
                day: r.day,
                avg_value: Some(r.avg_value),
            }));
        Ok(records.len() as u64)
    }

    async fn delete_realtime_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tables = self.inner.write().await;
        let before = tables.realtime.len();
        tables.realtime.retain(|r| !in_window(r, start, end));
        Ok((before - tables.realtime.len()) as u64)
    }
}
