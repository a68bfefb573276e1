use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Mirrors the `sensor_kind` Postgres enum.
///
/// Declaration order is the order sensors appear in every comfort profile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
    ToSchema,
)]
#[sqlx(type_name = "sensor_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorKind {
    Temperature,
    Humidity,
    AirQuality,
    Light,
    Sound,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::AirQuality,
        SensorKind::Light,
        SensorKind::Sound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Temperature => "TEMPERATURE",
            SensorKind::Humidity => "HUMIDITY",
            SensorKind::AirQuality => "AIR_QUALITY",
            SensorKind::Light => "LIGHT",
            SensorKind::Sound => "SOUND",
        }
    }

    /// Short label used in per-sensor insight sentences.
    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::AirQuality => "PM2.5",
            SensorKind::Light => "Light",
            SensorKind::Sound => "Sound",
        }
    }

    /// Title-cased kind name used in property-level insights.
    pub fn title(self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::AirQuality => "Air Quality",
            SensorKind::Light => "Light",
            SensorKind::Sound => "Sound",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Property {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub description: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProperty {
    pub name: String,
    pub address: String,
    pub description: String,
    pub image_url: Option<String>,
}

/// A single fine-grained observation, kept only until its GMT+8 day closes.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RealtimeReading {
    pub id: Uuid,
    pub property_id: i64,
    pub sensor_kind: SensorKind,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRealtimeReading {
    pub property_id: i64,
    pub sensor_kind: SensorKind,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// One daily average per property/sensor/day. Never deleted by the service.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct HistoricalReading {
    pub id: Uuid,
    pub property_id: i64,
    pub sensor_kind: SensorKind,
    pub day: NaiveDate,
    pub avg_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoricalReading {
    pub property_id: i64,
    pub sensor_kind: SensorKind,
    pub day: NaiveDate,
    pub avg_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&SensorKind::AirQuality).unwrap();
        assert_eq!(json, "\"AIR_QUALITY\"");
    }

    #[test]
    fn kind_deserializes_wire_names_only() {
        for kind in SensorKind::ALL {
            let parsed: SensorKind = serde_json::from_str(&format!("\"{kind}\"")).unwrap();
            assert_eq!(parsed, kind);
        }
        assert!(serde_json::from_str::<SensorKind>("\"CO2\"").is_err());
    }
}
