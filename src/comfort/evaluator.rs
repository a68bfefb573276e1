use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, NaiveDate};
use tracing::debug;

use super::{
    profiles::{normalize_profile, Profile},
    scoring::{assess, PropertyComfortResult},
};
use crate::{
    clock::Clock,
    db::models::{HistoricalReading, SensorKind},
    store::{Result, SharedStore},
};

/// Read-only comfort scoring over the Reading Store.
///
/// Holds no mutable state, so one instance is shared by every request.
/// Missing readings never fail an evaluation; only store errors do.
#[derive(Clone)]
pub struct ComfortEvaluator {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    history_days: i64,
}

impl ComfortEvaluator {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, history_days: i64) -> Self {
        Self { store, clock, history_days }
    }

    /// Full per-sensor breakdown for `property_id` under the requested
    /// profile. The caller has already checked that the property exists.
    pub async fn evaluate(
        &self,
        property_id: i64,
        requested_profile: Option<&str>,
    ) -> Result<(Profile, PropertyComfortResult)> {
        let profile = normalize_profile(requested_profile);
        let kinds: Vec<SensorKind> = profile.preferences().iter().map(|(k, _)| *k).collect();

        let mut latest = HashMap::new();
        for kind in &kinds {
            if let Some(reading) = self.store.latest(property_id, *kind).await? {
                latest.insert(*kind, reading);
            }
        }

        let since = self.history_since();
        let mut history: HashMap<SensorKind, Vec<HistoricalReading>> = HashMap::new();
        for row in self.store.history(property_id, &kinds, since).await? {
            history.entry(row.sensor_kind).or_default().push(row);
        }

        debug!(
            property_id,
            profile = profile.name(),
            realtime_sensors = latest.len(),
            historical_sensors = history.len(),
            "Evaluating comfort"
        );

        Ok((profile, assess(profile, &latest, &history)))
    }

    /// Overall score only, for list views.
    pub async fn score_only(
        &self,
        property_id: i64,
        requested_profile: Option<&str>,
    ) -> Result<f64> {
        let (_, result) = self.evaluate(property_id, requested_profile).await?;
        Ok(result.overall_score)
    }

    /// First day of the history window. A window reaching past the
    /// calendar's range covers all history.
    fn history_since(&self) -> NaiveDate {
        Duration::try_days(self.history_days.max(0))
            .and_then(|window| self.clock.today().checked_sub_signed(window))
            .unwrap_or(NaiveDate::MIN)
    }
}
