use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    comfort::{ComfortLevel, Profile, PropertyComfortResult},
    db::models::{HistoricalReading, Property, RealtimeReading, SensorKind},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    pub status: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProfileQuery {
    /// Profile name or alias; unknown values fall back to the default profile.
    pub customer_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
    pub name: String,
    pub description: String,
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            name: p.name().to_string(),
            description: p.description().to_string(),
        }
    }
}

/// A property with its overall score for the requested profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct PropertySummaryDto {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub description: String,
    pub image_url: Option<String>,
    /// 0–100, one decimal
    pub overall_comfort_score: f64,
    pub comfort_level: ComfortLevel,
}

impl PropertySummaryDto {
    pub fn new(p: Property, overall_comfort_score: f64, comfort_level: ComfortLevel) -> Self {
        Self {
            id: p.id,
            name: p.name,
            address: p.address,
            description: p.description,
            image_url: p.image_url,
            overall_comfort_score,
            comfort_level,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PropertyComfortDto {
    pub property_id: i64,
    pub property_name: String,
    /// Canonical name of the profile actually used.
    pub customer_type: String,
    #[serde(flatten)]
    pub result: PropertyComfortResult,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
    pub id: Uuid,
    pub property_id: i64,
    pub sensor_kind: SensorKind,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<RealtimeReading> for ReadingDto {
    fn from(r: RealtimeReading) -> Self {
        Self {
            id: r.id,
            property_id: r.property_id,
            sensor_kind: r.sensor_kind,
            value: r.value,
            recorded_at: r.recorded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestRequest {
    pub property_id: i64,
    pub sensor_kind: SensorKind,
    pub value: f64,
    /// Defaults to the server's current time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// One ten-minute bucket of the current day.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IntervalPointDto {
    /// Hours since local midnight (bucket index / 6)
    pub time: f64,
    pub value: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DailyAverageDto {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl From<HistoricalReading> for DailyAverageDto {
    fn from(h: HistoricalReading) -> Self {
        Self {
            date: h.day,
            value: h.avg_value,
        }
    }
}
