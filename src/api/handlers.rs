use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use utoipa::OpenApi;

use super::{
    dto::{
        DailyAverageDto, HealthDto, IngestRequest, IntervalPointDto, ProfileDto, ProfileQuery,
        PropertyComfortDto, PropertySummaryDto, ReadingDto,
    },
    errors::AppError,
    AppState,
};
use crate::{
    clock::day_window,
    comfort::{
        scoring::{level_for_score, round_to},
        ComfortLevel, Profile, PropertyComfortResult, SensorEvaluation, SensorStatus,
    },
    db::models::{NewRealtimeReading, Property, RealtimeReading, SensorKind},
};

/// Ten-minute buckets in one day.
const BUCKETS_PER_DAY: usize = 144;
const MONTHLY_DAYS: i64 = 30;
const YEARLY_DAYS: i64 = 365;

async fn require_property(state: &AppState, id: i64) -> Result<Property, AppError> {
    state
        .store
        .property(id)
        .await?
        .ok_or_else(|| AppError::property_not_found(id))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthDto)),
    tag = "meta"
)]
pub async fn health() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/profiles",
    responses((status = 200, description = "Supported comfort profiles", body = Vec<ProfileDto>)),
    tag = "comfort"
)]
pub async fn list_profiles() -> Json<Vec<ProfileDto>> {
    Json(Profile::ALL.into_iter().map(Into::into).collect())
}

/// All properties scored for one profile, best first.
#[utoipa::path(
    get,
    path = "/properties",
    params(ProfileQuery),
    responses(
        (
            status = 200,
            description = "Properties with overall comfort score",
            body = Vec<PropertySummaryDto>
        ),
        (status = 503, description = "Store unavailable"),
    ),
    tag = "properties"
)]
pub async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Vec<PropertySummaryDto>>, AppError> {
    let mut summaries = Vec::new();
    for property in state.store.properties().await? {
        let score = state
            .evaluator
            .score_only(property.id, query.customer_type.as_deref())
            .await?;
        summaries.push(PropertySummaryDto::new(property, score, level_for_score(score)));
    }
    summaries.sort_by(|a, b| b.overall_comfort_score.total_cmp(&a.overall_comfort_score));
    Ok(Json(summaries))
}

#[utoipa::path(
    get,
    path = "/properties/{id}",
    params(("id" = i64, Path, description = "Property id")),
    responses(
        (status = 200, description = "Property", body = Property),
        (status = 404, description = "Unknown property"),
    ),
    tag = "properties"
)]
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Property>, AppError> {
    Ok(Json(require_property(&state, id).await?))
}

/// Full per-sensor comfort breakdown.
#[utoipa::path(
    get,
    path = "/properties/{id}/comfort",
    params(("id" = i64, Path, description = "Property id"), ProfileQuery),
    responses(
        (status = 200, description = "Comfort evaluation", body = PropertyComfortDto),
        (status = 404, description = "Unknown property"),
        (status = 503, description = "Store unavailable"),
    ),
    tag = "comfort"
)]
pub async fn get_property_comfort(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<PropertyComfortDto>, AppError> {
    let property = require_property(&state, id).await?;
    let (profile, result) = state
        .evaluator
        .evaluate(id, query.customer_type.as_deref())
        .await?;

    Ok(Json(PropertyComfortDto {
        property_id: id,
        property_name: property.name,
        customer_type: profile.name().to_string(),
        result,
    }))
}

/// Newest realtime reading per sensor kind. Kinds without readings are omitted.
#[utoipa::path(
    get,
    path = "/properties/{id}/latest",
    params(("id" = i64, Path, description = "Property id")),
    responses(
        (
            status = 200,
            description = "Latest readings keyed by sensor kind",
            body = BTreeMap<String, ReadingDto>
        ),
        (status = 404, description = "Unknown property"),
    ),
    tag = "readings"
)]
pub async fn get_latest_readings(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BTreeMap<String, ReadingDto>>, AppError> {
    require_property(&state, id).await?;

    let mut latest = BTreeMap::new();
    for kind in SensorKind::ALL {
        if let Some(reading) = state.store.latest(id, kind).await? {
            latest.insert(kind.as_str().to_string(), reading.into());
        }
    }
    Ok(Json(latest))
}

/// Averages `readings` into the ten-minute buckets of the day starting at
/// `day_start`. Empty buckets carry `None`.
pub fn ten_minute_buckets(
    readings: &[RealtimeReading],
    day_start: DateTime<Utc>,
) -> Vec<IntervalPointDto> {
    let mut sums = [(0.0_f64, 0_u32); BUCKETS_PER_DAY];
    for r in readings {
        let minutes = (r.recorded_at - day_start).num_minutes();
        if minutes < 0 {
            continue;
        }
        if let Some((sum, count)) = sums.get_mut((minutes / 10) as usize) {
            *sum += r.value;
            *count += 1;
        }
    }

    sums.iter()
        .enumerate()
        .map(|(idx, (sum, count))| IntervalPointDto {
            time: idx as f64 / 6.0,
            value: (*count > 0).then(|| round_to(sum / f64::from(*count), 2)),
        })
        .collect()
}

/// Today's realtime readings in ten-minute buckets, per sensor kind.
#[utoipa::path(
    get,
    path = "/properties/{id}/history/24hour",
    params(("id" = i64, Path, description = "Property id")),
    responses(
        (
            status = 200,
            description = "144 buckets per sensor kind",
            body = BTreeMap<String, Vec<IntervalPointDto>>
        ),
        (status = 404, description = "Unknown property"),
    ),
    tag = "readings"
)]
pub async fn get_daily_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BTreeMap<String, Vec<IntervalPointDto>>>, AppError> {
    require_property(&state, id).await?;

    let (start, end) = day_window(state.clock.today());
    let mut series = BTreeMap::new();
    for kind in SensorKind::ALL {
        let readings = state.store.realtime_between(id, kind, start, end).await?;
        series.insert(kind.as_str().to_string(), ten_minute_buckets(&readings, start));
    }
    Ok(Json(series))
}

async fn daily_averages_since(
    state: &AppState,
    id: i64,
    days: i64,
) -> Result<BTreeMap<String, Vec<DailyAverageDto>>, AppError> {
    require_property(state, id).await?;

    let since = state.clock.today() - Duration::days(days);
    let mut grouped: BTreeMap<String, Vec<DailyAverageDto>> = BTreeMap::new();
    for row in state.store.history(id, &SensorKind::ALL, since).await? {
        grouped
            .entry(row.sensor_kind.as_str().to_string())
            .or_default()
            .push(row.into());
    }
    Ok(grouped)
}

#[utoipa::path(
    get,
    path = "/properties/{id}/history/monthly",
    params(("id" = i64, Path, description = "Property id")),
    responses(
        (
            status = 200,
            description = "Daily averages of the last 30 days",
            body = BTreeMap<String, Vec<DailyAverageDto>>
        ),
        (status = 404, description = "Unknown property"),
    ),
    tag = "readings"
)]
pub async fn get_monthly_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BTreeMap<String, Vec<DailyAverageDto>>>, AppError> {
    Ok(Json(daily_averages_since(&state, id, MONTHLY_DAYS).await?))
}

#[utoipa::path(
    get,
    path = "/properties/{id}/history/yearly",
    params(("id" = i64, Path, description = "Property id")),
    responses(
        (
            status = 200,
            description = "Daily averages of the last 365 days",
            body = BTreeMap<String, Vec<DailyAverageDto>>
        ),
        (status = 404, description = "Unknown property"),
    ),
    tag = "readings"
)]
pub async fn get_yearly_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BTreeMap<String, Vec<DailyAverageDto>>>, AppError> {
    Ok(Json(daily_averages_since(&state, id, YEARLY_DAYS).await?))
}

/// Store one reading pushed by an external sensor.
#[utoipa::path(
    post,
    path = "/realtime/ingest",
    request_body = IngestRequest,
    responses(
        (status = 201, description = "Reading stored", body = ReadingDto),
        (status = 404, description = "Unknown property"),
        (status = 503, description = "Store unavailable"),
    ),
    tag = "readings"
)]
pub async fn ingest_reading(
    State(state): State<AppState>,
    Json(body): Json<IngestRequest>,
) -> Result<(StatusCode, Json<ReadingDto>), AppError> {
    require_property(&state, body.property_id).await?;

    let stored = state
        .store
        .insert_realtime(&NewRealtimeReading {
            property_id: body.property_id,
            sensor_kind: body.sensor_kind,
            value: body.value,
            recorded_at: body.timestamp.unwrap_or_else(|| state.clock.now()),
        })
        .await?;

    tracing::debug!(
        property_id = stored.property_id,
        sensor = %stored.sensor_kind,
        value = stored.value,
        "Ingested reading"
    );
    Ok((StatusCode::CREATED, Json(stored.into())))
}

// ---------------------------------------------------------------------------
// OpenAPI spec struct (used in api/mod.rs)
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_profiles,
        list_properties,
        get_property,
        get_property_comfort,
        get_latest_readings,
        get_daily_history,
        get_monthly_history,
        get_yearly_history,
        ingest_reading,
    ),
    components(schemas(
        HealthDto,
        ProfileDto,
        Property,
        PropertySummaryDto,
        PropertyComfortDto,
        PropertyComfortResult,
        SensorEvaluation,
        SensorStatus,
        ComfortLevel,
        SensorKind,
        ReadingDto,
        IngestRequest,
        IntervalPointDto,
        DailyAverageDto,
    )),
    tags(
        (name = "meta", description = "Service health"),
        (name = "comfort", description = "Profile-based comfort scoring"),
        (name = "properties", description = "Monitored properties"),
        (name = "readings", description = "Realtime and historical sensor readings"),
    ),
    info(
        title = "Comfort Service API",
        version = "0.1.0",
        description = "Property comfort scoring over realtime and daily-average sensor data"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
