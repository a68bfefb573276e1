//! Live reading generator.
//!
//! Emits plausible realtime readings for every property so the scoring
//! engine and the rollup have data to work on without physical sensors.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tokio::{task::JoinHandle, time::{self, Instant}};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    clock::Clock,
    comfort::scoring::round_to,
    db::models::{NewRealtimeReading, SensorKind},
    store::{SharedStore, StoreError},
};

const TICK: Duration = Duration::from_secs(1);

/// How often each sensor kind reports.
pub fn cadence(kind: SensorKind) -> Duration {
    match kind {
        SensorKind::Temperature | SensorKind::Humidity | SensorKind::Light => {
            Duration::from_secs(600)
        }
        SensorKind::AirQuality => Duration::from_secs(10),
        SensorKind::Sound => Duration::from_secs(1),
    }
}

/// 06:00 up to (not including) 18:00 local time.
pub fn is_daytime(local: DateTime<FixedOffset>) -> bool {
    (6..18).contains(&local.hour())
}

/// Inclusive `(min, max)` ranges a simulated property produces.
#[derive(Debug, Clone, Copy)]
pub struct SensorRanges {
    pub temp_day: (f64, f64),
    pub temp_night: (f64, f64),
    pub humidity: (f64, f64),
    pub light_day: (f64, f64),
    pub light_night: (f64, f64),
    pub air_quality: (f64, f64),
    pub sound_day: (f64, f64),
    pub sound_night: (f64, f64),
}

impl SensorRanges {
    pub fn range(&self, kind: SensorKind, daytime: bool) -> (f64, f64) {
        match (kind, daytime) {
            (SensorKind::Temperature, true) => self.temp_day,
            (SensorKind::Temperature, false) => self.temp_night,
            (SensorKind::Humidity, _) => self.humidity,
            (SensorKind::Light, true) => self.light_day,
            (SensorKind::Light, false) => self.light_night,
            (SensorKind::AirQuality, _) => self.air_quality,
            (SensorKind::Sound, true) => self.sound_day,
            (SensorKind::Sound, false) => self.sound_night,
        }
    }
}

/// One entry per simulated property; ids past the end wrap around.
pub const PROPERTY_RANGES: [SensorRanges; 11] = [
    SensorRanges {
        temp_day: (23.0, 25.0),
        temp_night: (21.0, 22.0),
        humidity: (45.0, 55.0),
        light_day: (600.0, 800.0),
        light_night: (0.0, 10.0),
        air_quality: (5.0, 8.0),
        sound_day: (40.0, 45.0),
        sound_night: (35.0, 38.0),
    },
    SensorRanges {
        temp_day: (22.0, 24.0),
        temp_night: (21.0, 22.0),
        humidity: (40.0, 50.0),
        light_day: (1200.0, 1500.0),
        light_night: (0.0, 50.0),
        air_quality: (10.0, 15.0),
        sound_day: (65.0, 70.0),
        sound_night: (45.0, 50.0),
    },
    SensorRanges {
        temp_day: (22.0, 24.0),
        temp_night: (19.0, 20.0),
        humidity: (45.0, 55.0),
        light_day: (500.0, 700.0),
        light_night: (0.0, 5.0),
        air_quality: (3.0, 7.0),
        sound_day: (50.0, 55.0),
        sound_night: (30.0, 35.0),
    },
    SensorRanges {
        temp_day: (21.0, 23.0),
        temp_night: (19.0, 20.0),
        humidity: (50.0, 60.0),
        light_day: (400.0, 600.0),
        light_night: (0.0, 50.0),
        air_quality: (8.0, 12.0),
        sound_day: (60.0, 65.0),
        sound_night: (40.0, 45.0),
    },
    SensorRanges {
        temp_day: (24.0, 27.0),
        temp_night: (21.0, 22.0),
        humidity: (40.0, 45.0),
        light_day: (1800.0, 2000.0),
        light_night: (0.0, 50.0),
        air_quality: (5.0, 10.0),
        sound_day: (45.0, 50.0),
        sound_night: (38.0, 42.0),
    },
    SensorRanges {
        temp_day: (22.0, 23.0),
        temp_night: (20.0, 21.0),
        humidity: (45.0, 50.0),
        light_day: (500.0, 600.0),
        light_night: (0.0, 30.0),
        air_quality: (7.0, 10.0),
        sound_day: (48.0, 52.0),
        sound_night: (38.0, 40.0),
    },
    SensorRanges {
        temp_day: (20.0, 24.0),
        temp_night: (18.0, 19.0),
        humidity: (55.0, 65.0),
        light_day: (300.0, 500.0),
        light_night: (0.0, 50.0),
        air_quality: (8.0, 15.0),
        sound_day: (50.0, 55.0),
        sound_night: (40.0, 45.0),
    },
    SensorRanges {
        temp_day: (19.0, 20.0),
        temp_night: (18.0, 19.0),
        humidity: (60.0, 65.0),
        light_day: (200.0, 300.0),
        light_night: (0.0, 10.0),
        air_quality: (5.0, 8.0),
        sound_day: (45.0, 48.0),
        sound_night: (35.0, 38.0),
    },
    SensorRanges {
        temp_day: (22.0, 22.5),
        temp_night: (21.0, 21.5),
        humidity: (48.0, 52.0),
        light_day: (700.0, 900.0),
        light_night: (0.0, 10.0),
        air_quality: (1.0, 3.0),
        sound_day: (42.0, 45.0),
        sound_night: (32.0, 35.0),
    },
    SensorRanges {
        temp_day: (21.0, 23.0),
        temp_night: (20.0, 21.0),
        humidity: (45.0, 55.0),
        light_day: (800.0, 1000.0),
        light_night: (0.0, 50.0),
        air_quality: (12.0, 18.0),
        sound_day: (70.0, 80.0),
        sound_night: (40.0, 45.0),
    },
    SensorRanges {
        temp_day: (21.5, 22.5),
        temp_night: (21.0, 22.0),
        humidity: (42.0, 48.0),
        light_day: (600.0, 800.0),
        light_night: (0.0, 20.0),
        air_quality: (2.0, 5.0),
        sound_day: (30.0, 40.0),
        sound_night: (25.0, 30.0),
    },
];

pub fn ranges_for(property_id: i64) -> &'static SensorRanges {
    let len = PROPERTY_RANGES.len() as i64;
    // rem_euclid keeps the index in 0..len for any id, including 0 and negatives.
    &PROPERTY_RANGES[(property_id - 1).rem_euclid(len) as usize]
}

/// Normal draw centred in `(min, max)` with std = width / 6, clamped to
/// the range and rounded to 2 decimals.
pub fn sample<R: Rng + ?Sized>((min, max): (f64, f64), rng: &mut R) -> f64 {
    let mean = (min + max) / 2.0;
    let value = match Normal::new(mean, (max - min) / 6.0) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    };
    round_to(value.clamp(min, max), 2)
}

/// Remembers when each property/sensor pair last reported.
#[derive(Debug, Default)]
pub struct EmissionTracker {
    last: HashMap<(i64, SensorKind), Instant>,
}

impl EmissionTracker {
    /// Pairs that never reported are always due.
    pub fn is_due(&self, property_id: i64, kind: SensorKind, now: Instant) -> bool {
        self.last
            .get(&(property_id, kind))
            .map_or(true, |last| now.duration_since(*last) >= cadence(kind))
    }

    pub fn mark(&mut self, property_id: i64, kind: SensorKind, now: Instant) {
        self.last.insert((property_id, kind), now);
    }
}

/// Readings due at `now` for the given properties, not yet marked.
fn plan_batch(
    property_ids: &[i64],
    tracker: &EmissionTracker,
    local_now: DateTime<FixedOffset>,
    now: Instant,
) -> Vec<NewRealtimeReading> {
    let daytime = is_daytime(local_now);
    let mut rng = rand::thread_rng();
    let mut batch = Vec::new();

    for &property_id in property_ids {
        let ranges = ranges_for(property_id);
        for kind in SensorKind::ALL {
            if !tracker.is_due(property_id, kind, now) {
                continue;
            }
            batch.push(NewRealtimeReading {
                property_id,
                sensor_kind: kind,
                value: sample(ranges.range(kind, daytime), &mut rng),
                recorded_at: local_now.with_timezone(&Utc),
            });
        }
    }
    batch
}

/// One generator pass: write every due reading and mark it emitted.
///
/// Stops at the first store error; unwritten readings stay due and are
/// retried on the next tick.
pub async fn tick(
    store: &SharedStore,
    clock: &dyn Clock,
    tracker: &mut EmissionTracker,
    now: Instant,
) -> Result<usize, StoreError> {
    let property_ids: Vec<i64> = store.properties().await?.iter().map(|p| p.id).collect();
    let batch = plan_batch(&property_ids, tracker, clock.local_now(), now);

    let mut written = 0;
    for reading in &batch {
        store.insert_realtime(reading).await?;
        tracker.mark(reading.property_id, reading.sensor_kind, now);
        written += 1;
    }
    Ok(written)
}

/// Background task feeding simulated readings into the store.
pub struct ReadingGenerator {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ReadingGenerator {
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            cancel_token: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn start(&mut self) {
        if self.handle.is_some() || self.cancel_token.is_cancelled() {
            return;
        }
        info!(tick_ms = TICK.as_millis() as u64, "Reading generator started");
        self.handle = Some(tokio::spawn(run(
            self.store.clone(),
            self.clock.clone(),
            self.cancel_token.clone(),
        )));
    }

    pub async fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Reading generator task failed to join");
            }
        }
    }
}

async fn run(store: SharedStore, clock: Arc<dyn Clock>, cancel_token: CancellationToken) {
    let mut tracker = EmissionTracker::default();
    loop {
        if cancel_token.is_cancelled() {
            break;
        }

        match tick(&store, clock.as_ref(), &mut tracker, Instant::now()).await {
            Ok(0) => {}
            Ok(written) => debug!(written, "Simulated readings stored"),
            Err(e) => error!(error = %e, "Reading generator pass failed"),
        }

        tokio::select! {
            _ = time::sleep(TICK) => {}
            _ = cancel_token.cancelled() => break,
        }
    }
    info!("Reading generator stopped");
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        clock::{day_window, gmt_plus_8, local, ManualClock},
        db::models::NewProperty,
        store::{MemoryReadingStore, ReadingStore},
    };

    #[test]
    fn day_is_six_to_eighteen_local() {
        let at = |h| local(2024, 3, 1, h, 0).with_timezone(&gmt_plus_8());
        assert!(!is_daytime(at(5)));
        assert!(is_daytime(at(6)));
        assert!(is_daytime(at(17)));
        assert!(!is_daytime(at(18)));
        assert!(!is_daytime(at(0)));
    }

    #[test]
    fn samples_stay_inside_range_with_two_decimals() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let v = sample((21.5, 22.5), &mut rng);
            assert!((21.5..=22.5).contains(&v), "{v} escaped the range");
            assert_eq!(v, round_to(v, 2));
        }
    }

    #[test]
    fn zero_width_range_returns_its_bound() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample((0.0, 0.0), &mut rng), 0.0);
    }

    #[test]
    fn property_ids_wrap_around_the_table() {
        assert_eq!(ranges_for(1).sound_day, (40.0, 45.0));
        assert_eq!(ranges_for(12).sound_day, ranges_for(1).sound_day);
        assert_eq!(ranges_for(11).range(SensorKind::AirQuality, false), (2.0, 5.0));
        assert_eq!(ranges_for(0).sound_day, ranges_for(11).sound_day);
    }

    #[test]
    fn cadence_tracks_each_pair() {
        let start = Instant::now();
        let mut tracker = EmissionTracker::default();
        assert!(tracker.is_due(1, SensorKind::AirQuality, start));

        tracker.mark(1, SensorKind::AirQuality, start);
        assert!(!tracker.is_due(1, SensorKind::AirQuality, start + Duration::from_secs(9)));
        assert!(tracker.is_due(1, SensorKind::AirQuality, start + Duration::from_secs(10)));
        assert!(tracker.is_due(2, SensorKind::AirQuality, start));
    }

    async fn store_with(n: usize) -> SharedStore {
        let store = MemoryReadingStore::new();
        for i in 0..n {
            store
                .insert_property(&NewProperty {
                    name: format!("Property {i}"),
                    address: String::new(),
                    description: String::new(),
                    image_url: None,
                })
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn first_tick_emits_every_sensor_then_follows_cadence() {
        let store = store_with(2).await;
        let clock = ManualClock::new(local(2024, 3, 1, 10, 0));
        let mut tracker = EmissionTracker::default();
        let t0 = Instant::now();
        let at = |secs| t0 + Duration::from_secs(secs);

        assert_eq!(tick(&store, &clock, &mut tracker, t0).await.unwrap(), 10);
        // One second later only sound is due.
        assert_eq!(tick(&store, &clock, &mut tracker, at(1)).await.unwrap(), 2);
        // Ten seconds in, air quality joins.
        assert_eq!(tick(&store, &clock, &mut tracker, at(10)).await.unwrap(), 4);
        assert_eq!(tick(&store, &clock, &mut tracker, at(600)).await.unwrap(), 10);

        let temp = store.latest(1, SensorKind::Temperature).await.unwrap().unwrap();
        assert!((23.0..=25.0).contains(&temp.value));
        assert_eq!(temp.recorded_at, local(2024, 3, 1, 10, 0));
    }

    #[tokio::test]
    async fn night_readings_use_night_ranges() {
        let store = store_with(1).await;
        let clock = ManualClock::new(local(2024, 3, 1, 23, 0));
        let mut tracker = EmissionTracker::default();
        tick(&store, &clock, &mut tracker, Instant::now()).await.unwrap();

        let light = store.latest(1, SensorKind::Light).await.unwrap().unwrap();
        assert!((0.0..=10.0).contains(&light.value));
    }

    #[tokio::test(start_paused = true)]
    async fn generator_runs_until_stopped() {
        let store = store_with(1).await;
        let clock = ManualClock::new(local(2024, 3, 1, 10, 0));
        let mut generator = ReadingGenerator::new(store.clone(), Arc::new(clock));

        generator.start();
        generator.start();
        time::sleep(Duration::from_millis(2_500)).await;
        assert!(generator.is_running());

        generator.stop().await;
        assert!(!generator.is_running());
        generator.stop().await;
        generator.start();
        assert!(!generator.is_running());

        let (start, end) = day_window(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let sound = store.realtime_between(1, SensorKind::Sound, start, end).await.unwrap();
        assert_eq!(sound.len(), 3);
    }
}
