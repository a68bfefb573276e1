use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::debug;

use super::{ReadingStore, Result, WindowAverage};
use crate::db::models::{
    HistoricalReading, NewHistoricalReading, NewProperty, NewRealtimeReading, Property,
    RealtimeReading, SensorKind,
};

/// Postgres-backed Reading Store. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn properties(&self) -> Result<Vec<Property>> {
        let rows = sqlx::query_as::<_, Property>(
            "SELECT id, name, address, description, image_url FROM properties ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn property(&self, id: i64) -> Result<Option<Property>> {
        let row = sqlx::query_as::<_, Property>(
            "SELECT id, name, address, description, image_url FROM properties WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_property(&self, property: &NewProperty) -> Result<Property> {
        let row = sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (name, address, description, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, address, description, image_url
            "#,
        )
        .bind(&property.name)
        .bind(&property.address)
        .bind(&property.description)
        .bind(&property.image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_realtime(&self, reading: &NewRealtimeReading) -> Result<RealtimeReading> {
        let row = sqlx::query_as::<_, RealtimeReading>(
            r#"
            INSERT INTO realtime_readings (property_id, sensor_kind, value, recorded_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, property_id, sensor_kind, value, recorded_at
            "#,
        )
        .bind(reading.property_id)
        .bind(reading.sensor_kind)
        .bind(reading.value)
        .bind(reading.recorded_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn latest(&self, property_id: i64, kind: SensorKind) -> Result<Option<RealtimeReading>> {
        let row = sqlx::query_as::<_, RealtimeReading>(
            r#"
            SELECT id, property_id, sensor_kind, value, recorded_at
            FROM realtime_readings
            WHERE property_id = $1
              AND sensor_kind = $2
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(property_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn realtime_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RealtimeReading>> {
        let rows = sqlx::query_as::<_, RealtimeReading>(
            r#"
            SELECT id, property_id, sensor_kind, value, recorded_at
            FROM realtime_readings
            WHERE property_id  = $1
              AND sensor_kind  = $2
              AND recorded_at >= $3
              AND recorded_at <  $4
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(property_id)
        .bind(kind)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn average_between(
        &self,
        property_id: i64,
        kind: SensorKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<WindowAverage>> {
        let (mean, samples) = sqlx::query_as::<_, (Option<f64>, i64)>(
            r#"
            SELECT AVG(value) AS mean, COUNT(*) AS samples
            FROM realtime_readings
            WHERE property_id  = $1
              AND sensor_kind  = $2
              AND recorded_at >= $3
              AND recorded_at <  $4
            "#,
        )
        .bind(property_id)
        .bind(kind)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(mean.map(|mean| WindowAverage {
            mean,
            samples: samples.max(0) as u64,
        }))
    }

    async fn history(
        &self,
        property_id: i64,
        kinds: &[SensorKind],
        since: NaiveDate,
    ) -> Result<Vec<HistoricalReading>> {
        let rows = sqlx::query_as::<_, HistoricalReading>(
            r#"
            SELECT id, property_id, sensor_kind, day, avg_value
            FROM historical_readings
            WHERE property_id = $1
              AND sensor_kind = ANY($2)
              AND day >= $3
            ORDER BY day ASC, created_at ASC, id ASC
            "#,
        )
        .bind(property_id)
        .bind(kinds.to_vec())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_historical(&self, records: &[NewHistoricalReading]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for record in records {
            written += sqlx::query(
                r#"
                INSERT INTO historical_readings (property_id, sensor_kind, day, avg_value)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(record.property_id)
            .bind(record.sensor_kind)
            .bind(record.day)
            .bind(record.avg_value)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        // Dropping `tx` on an early return above rolls everything back.
        tx.commit().await?;
        debug!(written, "Historical readings committed");
        Ok(written)
    }

    async fn delete_realtime_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        let done = sqlx::query(
            "DELETE FROM realtime_readings WHERE recorded_at >= $1 AND recorded_at < $2",
        )
        .bind(start)
        .bind(end)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// Tests (need a live Postgres via DATABASE_URL)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use sqlx::PgPool;

    use super::*;

    async fn seeded(pool: PgPool) -> (PgReadingStore, i64) {
        let store = PgReadingStore::new(pool);
        let property = store
            .insert_property(&NewProperty {
                name: "Sunny Apartment".into(),
                address: "123 Main Street".into(),
                description: String::new(),
                image_url: None,
            })
            .await
            .unwrap();
        (store, property.id)
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    fn sound_avg(property_id: i64, day: NaiveDate, avg_value: f64) -> NewHistoricalReading {
        NewHistoricalReading {
            property_id,
            sensor_kind: SensorKind::Sound,
            day,
            avg_value,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn average_and_delete_use_the_same_window(pool: PgPool) {
        let (store, id) = seeded(pool).await;
        for (h, v) in [(1, 22.0), (2, 24.0), (3, 26.0)] {
            store
                .insert_realtime(&NewRealtimeReading {
                    property_id: id,
                    sensor_kind: SensorKind::Temperature,
                    value: v,
                    recorded_at: at(h),
                })
                .await
                .unwrap();
        }

        let avg = store
            .average_between(id, SensorKind::Temperature, at(0), at(3))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(avg, WindowAverage { mean: 23.0, samples: 2 });

        let deleted = store.delete_realtime_between(at(0), at(3)).await.unwrap();
        assert_eq!(deleted, 2);
        let left = store.latest(id, SensorKind::Temperature).await.unwrap().unwrap();
        assert_eq!(left.value, 26.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn history_is_ordered_and_filtered(pool: PgPool) {
        let (store, id) = seeded(pool).await;
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let written = store
            .insert_historical(&[
                sound_avg(id, day(2), 41.0),
                sound_avg(id, day(1), 39.5),
                NewHistoricalReading {
                    property_id: id,
                    sensor_kind: SensorKind::Light,
                    day: day(1),
                    avg_value: 700.0,
                },
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);

        let rows = store.history(id, &[SensorKind::Sound], day(1)).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].day, day(1));
        assert_eq!(rows[1].avg_value, Some(41.0));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_days_come_back_in_write_order(pool: PgPool) {
        let (store, id) = seeded(pool).await;
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        for avg in [40.0, 44.0, 42.0] {
            store.insert_historical(&[sound_avg(id, day, avg)]).await.unwrap();
        }

        for _ in 0..3 {
            let rows = store.history(id, &[SensorKind::Sound], day).await.unwrap();
            let values: Vec<_> = rows.iter().map(|r| r.avg_value).collect();
            assert_eq!(values, vec![Some(40.0), Some(44.0), Some(42.0)]);
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn failed_historical_batch_writes_nothing(pool: PgPool) {
        let (store, id) = seeded(pool).await;
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let result = store
            .insert_historical(&[
                sound_avg(id, day, 41.0),
                // Violates the properties foreign key.
                sound_avg(id + 1000, day, 41.0),
            ])
            .await;
        assert!(result.is_err());

        let rows = store
            .history(id, &SensorKind::ALL, day - Duration::days(1))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
