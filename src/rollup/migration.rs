use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
    clock::day_window,
    comfort::scoring::round_to,
    db::models::{NewHistoricalReading, SensorKind},
    store::{ReadingStore, StoreError},
};

/// Why a day's rollup was abandoned.
///
/// Historical rows committed before the failure are kept; realtime rows
/// are only deleted after the historical write succeeded.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("rollup {day}: listing properties failed: {source}")]
    ListProperties { day: NaiveDate, source: StoreError },

    #[error("rollup {day}: averaging property {property_id} {sensor} failed: {source}")]
    Aggregate {
        day: NaiveDate,
        property_id: i64,
        sensor: SensorKind,
        source: StoreError,
    },

    #[error("rollup {day}: writing daily averages failed: {source}")]
    WriteHistorical { day: NaiveDate, source: StoreError },

    #[error("rollup {day}: deleting realtime readings failed: {source}")]
    DeleteRealtime { day: NaiveDate, source: StoreError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub day: NaiveDate,
    /// Daily-average rows written.
    pub historical_written: u64,
    /// Realtime rows that fed those averages.
    pub readings_averaged: u64,
    pub realtime_deleted: u64,
}

/// Roll one closed GMT+8 day of realtime readings into daily averages,
/// then purge those readings.
///
/// Averages are staged for every property/sensor pair and committed as one
/// atomic write. The delete runs afterwards over the exact same window.
pub async fn migrate_day(
    store: &dyn ReadingStore,
    day: NaiveDate,
) -> Result<MigrationReport, MigrationError> {
    let (start, end) = day_window(day);
    let properties = store
        .properties()
        .await
        .map_err(|source| MigrationError::ListProperties { day, source })?;

    let mut staged = Vec::new();
    let mut readings_averaged = 0;

    for property in &properties {
        for kind in SensorKind::ALL {
            let average = store
                .average_between(property.id, kind, start, end)
                .await
                .map_err(|source| MigrationError::Aggregate {
                    day,
                    property_id: property.id,
                    sensor: kind,
                    source,
                })?;

            if let Some(average) = average {
                debug!(
                    property_id = property.id,
                    sensor = %kind,
                    samples = average.samples,
                    "Staging daily average"
                );
                readings_averaged += average.samples;
                staged.push(NewHistoricalReading {
                    property_id: property.id,
                    sensor_kind: kind,
                    day,
                    avg_value: round_to(average.mean, 2),
                });
            }
        }
    }

    let historical_written = if staged.is_empty() {
        0
    } else {
        store
            .insert_historical(&staged)
            .await
            .map_err(|source| MigrationError::WriteHistorical { day, source })?
    };
    info!(date = %day, written = historical_written, "Daily averages migrated to history");

    let realtime_deleted = store
        .delete_realtime_between(start, end)
        .await
        .map_err(|source| MigrationError::DeleteRealtime { day, source })?;
    info!(date = %day, deleted = realtime_deleted, "Cleared migrated realtime readings");

    Ok(MigrationReport {
        day,
        historical_written,
        readings_averaged,
        realtime_deleted,
    })
}
