//! Pure scoring rules: per-sensor score, status, history match, the
//! weighted overall verdict and the insight sentences.
//!
//! Nothing in here touches the store; [`super::evaluator`] gathers the
//! readings and hands them to [`assess`].

use std::{collections::HashMap, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::profiles::{Profile, SensorPreference};
use crate::db::models::{HistoricalReading, RealtimeReading, SensorKind};

/// Warnings and positives kept in the final insight list, each.
const INSIGHTS_PER_KIND: usize = 2;
const MAX_INSIGHTS: usize = 4;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum SensorStatus {
    Ideal,
    Comfortable,
    Monitor,
    Attention,
    #[serde(rename = "No Data")]
    NoData,
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorStatus::Ideal => "Ideal",
            SensorStatus::Comfortable => "Comfortable",
            SensorStatus::Monitor => "Monitor",
            SensorStatus::Attention => "Attention",
            SensorStatus::NoData => "No Data",
        })
    }
}

/// Property-level verdict. Coarser than [`SensorStatus`] on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ComfortLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "No Data")]
    NoData,
}

impl fmt::Display for ComfortLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComfortLevel::Excellent => "Excellent",
            ComfortLevel::Good => "Good",
            ComfortLevel::Fair => "Fair",
            ComfortLevel::Poor => "Poor",
            ComfortLevel::NoData => "No Data",
        })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Everything computed for one sensor of one property. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SensorEvaluation {
    pub sensor_kind: SensorKind,
    pub current_value: Option<f64>,
    pub current_value_timestamp: Option<DateTime<Utc>>,
    /// Most recent daily average.
    pub daily_average: Option<f64>,
    pub daily_average_date: Option<NaiveDate>,
    pub score: Option<f64>,
    pub status: SensorStatus,
    pub insight: String,
    /// Share of tracked days whose average sat inside the preferred range.
    pub percentage_match: Option<f64>,
    pub days_tracked: usize,
    pub preferred_min: Option<f64>,
    pub preferred_max: Option<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PropertyComfortResult {
    pub overall_score: f64,
    pub comfort_level: ComfortLevel,
    /// In the profile's declared sensor order.
    pub sensors: Vec<SensorEvaluation>,
    pub insights: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scoring rules
// ---------------------------------------------------------------------------

/// Round to `places` decimals using the exact decimal value of `value`,
/// with exact ties going to the even digit.
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

/// Piecewise-linear 0–100 score for `value` against `pref`.
///
/// 100 inside the preferred interval, falling linearly with the distance
/// from the violated bound and reaching 0 once that distance equals the
/// scale. `None` when there is no value or the preference has no bounds.
pub fn calculate_scaled_score(value: Option<f64>, pref: &SensorPreference) -> Option<f64> {
    let value = value?;
    if pref.min.is_none() && pref.max.is_none() {
        return None;
    }

    if pref.contains(value) {
        return Some(100.0);
    }

    let distance = match (pref.min, pref.max) {
        (Some(min), _) if value < min => min - value,
        (_, Some(max)) if value > max => value - max,
        _ => 0.0,
    };

    let scale = match (pref.min, pref.max) {
        (Some(min), Some(max)) if max > min => max - min,
        _ => {
            let reference = match pref.max {
                Some(max) if max != 0.0 => Some(max),
                _ => pref.min,
            };
            let scaled = match reference {
                Some(r) if r != 0.0 => r * 0.2,
                _ => 5.0,
            };
            scaled.max(1.0)
        }
    };

    let penalty = (distance / scale).min(1.0);
    let score = (100.0 * (1.0 - penalty)).max(0.0);
    Some(round_to(score, 1))
}

pub fn score_to_status(score: Option<f64>) -> SensorStatus {
    match score {
        None => SensorStatus::NoData,
        Some(s) if s >= 90.0 => SensorStatus::Ideal,
        Some(s) if s >= 75.0 => SensorStatus::Comfortable,
        Some(s) if s >= 60.0 => SensorStatus::Monitor,
        Some(_) => SensorStatus::Attention,
    }
}

/// Percentage of days whose average is inside the preference, and how many
/// days were considered.
///
/// Days without an average still count in the denominator.
pub fn percentage_match(averages: &[Option<f64>], pref: &SensorPreference) -> (Option<f64>, usize) {
    if averages.is_empty() {
        return (None, 0);
    }

    let matches = averages
        .iter()
        .flatten()
        .filter(|v| pref.contains(**v))
        .count();
    let total = averages.len();
    (Some(round_to(matches as f64 / total as f64 * 100.0, 1)), total)
}

/// Weighted mean over scored sensors, rounded to one decimal, plus the
/// total weight that went into it.
pub fn overall_score(sensors: &[SensorEvaluation]) -> (f64, f64) {
    let (weighted, total_weight) = sensors
        .iter()
        .filter_map(|s| s.score.map(|score| (score, s.weight)))
        .fold((0.0, 0.0), |(sum, w), (score, weight)| (sum + score * weight, w + weight));

    if total_weight == 0.0 {
        (0.0, 0.0)
    } else {
        (round_to(weighted / total_weight, 1), total_weight)
    }
}

/// Level from the overall score alone. List views only carry the score,
/// so they never report "No Data".
pub fn level_for_score(overall: f64) -> ComfortLevel {
    if overall >= 85.0 {
        ComfortLevel::Excellent
    } else if overall >= 70.0 {
        ComfortLevel::Good
    } else if overall >= 55.0 {
        ComfortLevel::Fair
    } else {
        ComfortLevel::Poor
    }
}

pub fn comfort_level(overall: f64, total_weight: f64) -> ComfortLevel {
    match level_for_score(overall) {
        ComfortLevel::Poor if total_weight == 0.0 => ComfortLevel::NoData,
        level => level,
    }
}

// ---------------------------------------------------------------------------
// Insight text
// ---------------------------------------------------------------------------

pub fn format_range(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("{min:.0}–{max:.0}"),
        (None, Some(max)) => format!("<{max:.0}"),
        (Some(min), None) => format!(">{min:.0}"),
        (None, None) => "—".to_owned(),
    }
}

pub fn sensor_insight(
    kind: SensorKind,
    score: Option<f64>,
    value_for_score: Option<f64>,
    pref: &SensorPreference,
    percentage: Option<f64>,
) -> String {
    let label = kind.label();
    let (Some(_), Some(value)) = (score, value_for_score) else {
        return format!("{label} data is not yet available to score this property.");
    };

    let direction = match (pref.min, pref.max) {
        (Some(min), _) if value < min => Some("below"),
        (_, Some(max)) if value > max => Some("above"),
        _ => None,
    };

    let base = match direction {
        None => format!("{label} averages are squarely within the preferred range."),
        Some(direction) => format!(
            "{label} daily average ({value:.1}) sits {direction} the target range of {}.",
            format_range(pref.min, pref.max)
        ),
    };

    match percentage {
        Some(p) => format!("{base} Annual match rate: {p:.1}% of days."),
        None => base,
    }
}

/// Up to two warnings followed by up to two positives, in sensor order.
pub fn property_insights(sensors: &[SensorEvaluation], profile: Profile) -> Vec<String> {
    let audience = profile.name().to_lowercase();
    let mut warnings = Vec::new();
    let mut positives = Vec::new();

    for sensor in sensors {
        let name = sensor.sensor_kind.title();
        let range = format_range(sensor.preferred_min, sensor.preferred_max);

        match sensor.score {
            None => warnings.push(format!(
                "Need more {} data to understand how it fits {audience}.",
                name.to_lowercase()
            )),
            Some(score) if score >= 90.0 => positives.push(format!(
                "{name} consistently stays within the ideal range ({range})."
            )),
            Some(score) if score < 70.0 => {
                let detail = match sensor.percentage_match {
                    Some(p) => format!("only {p:.0}% of days meet the preference."),
                    None => "improve monitoring.".to_owned(),
                };
                warnings.push(format!(
                    "{name} drifts outside the target range ({range}); {detail}"
                ));
            }
            Some(_) => {}
        }
    }

    let mut insights: Vec<String> = warnings
        .into_iter()
        .take(INSIGHTS_PER_KIND)
        .chain(positives.into_iter().take(INSIGHTS_PER_KIND))
        .collect();
    insights.truncate(MAX_INSIGHTS);

    if insights.is_empty() {
        insights.push(format!("Conditions are balanced for {audience}."));
    }
    insights
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Score one sensor from its newest realtime reading and its daily-average
/// history (oldest first).
///
/// The live score prefers the realtime value and falls back to the latest
/// daily average.
pub fn evaluate_sensor(
    kind: SensorKind,
    pref: &SensorPreference,
    latest: Option<&RealtimeReading>,
    history: &[HistoricalReading],
) -> SensorEvaluation {
    let last_day = history.last();
    let daily_average = last_day.and_then(|h| h.avg_value);
    let averages: Vec<Option<f64>> = history.iter().map(|h| h.avg_value).collect();
    let (percentage, days_tracked) = percentage_match(&averages, pref);

    let current_value = latest.map(|r| r.value);
    let value_for_score = current_value.or(daily_average);
    let score = calculate_scaled_score(value_for_score, pref);

    SensorEvaluation {
        sensor_kind: kind,
        current_value,
        current_value_timestamp: latest.map(|r| r.recorded_at),
        daily_average,
        daily_average_date: last_day.map(|h| h.day),
        score,
        status: score_to_status(score),
        insight: sensor_insight(kind, score, value_for_score, pref, percentage),
        percentage_match: percentage,
        days_tracked,
        preferred_min: pref.min,
        preferred_max: pref.max,
        weight: pref.weight,
    }
}

/// Build the full verdict for one property under `profile`.
pub fn assess(
    profile: Profile,
    latest: &HashMap<SensorKind, RealtimeReading>,
    history: &HashMap<SensorKind, Vec<HistoricalReading>>,
) -> PropertyComfortResult {
    let sensors: Vec<SensorEvaluation> = profile
        .preferences()
        .iter()
        .map(|(kind, pref)| {
            let rows = history.get(kind).map(Vec::as_slice).unwrap_or_default();
            evaluate_sensor(*kind, pref, latest.get(kind), rows)
        })
        .collect();

    let (overall_score, total_weight) = overall_score(&sensors);
    PropertyComfortResult {
        overall_score,
        comfort_level: comfort_level(overall_score, total_weight),
        insights: property_insights(&sensors, profile),
        sensors,
    }
}
