use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use tokio::{sync::watch, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::migration::{migrate_day, MigrationError, MigrationReport};
use crate::{clock::Clock, store::SharedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Aggregating,
    Stopped,
}

/// The single-writer "last seen day" cursor and the rollover check.
///
/// Owned by the scheduler task; nothing else can move it.
pub struct DayCursor {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    catch_up: bool,
    last_seen: NaiveDate,
}

impl DayCursor {
    /// Starts at "today" in GMT+8.
    pub fn new(store: SharedStore, clock: Arc<dyn Clock>, catch_up: bool) -> Self {
        let last_seen = clock.today();
        Self { store, clock, catch_up, last_seen }
    }

    pub fn last_seen(&self) -> NaiveDate {
        self.last_seen
    }

    /// Compare today against the cursor and roll up closed days.
    ///
    /// Without catch-up only the previously seen day is migrated, even if
    /// several days passed between polls. The cursor always advances to
    /// today afterwards, whether or not the migration succeeded.
    pub async fn poll(
        &mut self,
        state: &watch::Sender<SchedulerState>,
    ) -> Vec<Result<MigrationReport, MigrationError>> {
        let today = self.clock.today();
        if today == self.last_seen {
            return Vec::new();
        }
        if today < self.last_seen {
            warn!(
                last_seen = %self.last_seen,
                today = %today,
                "Clock moved back a day; resetting rollup cursor"
            );
            self.last_seen = today;
            return Vec::new();
        }

        let days: Vec<NaiveDate> = if self.catch_up {
            self.last_seen.iter_days().take_while(|d| *d < today).collect()
        } else {
            vec![self.last_seen]
        };
        info!(
            from = %self.last_seen,
            to = %today,
            days = days.len(),
            "New day detected; rolling up"
        );

        state.send_replace(SchedulerState::Aggregating);
        let mut outcomes = Vec::with_capacity(days.len());
        for day in days {
            let outcome = migrate_day(self.store.as_ref(), day).await;
            match &outcome {
                Ok(report) => info!(
                    date = %report.day,
                    written = report.historical_written,
                    deleted = report.realtime_deleted,
                    "Rollup complete"
                ),
                Err(e) => error!(date = %day, error = %e, "Rollup failed; day will not be retried"),
            }
            outcomes.push(outcome);
        }

        self.last_seen = today;
        state.send_replace(SchedulerState::Idle);
        outcomes
    }
}

/// Long-running loop that rolls each closed day of realtime readings into
/// daily averages.
///
/// `start` and `stop` are both idempotent. A stopped scheduler stays
/// stopped.
pub struct RollupScheduler {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    catch_up: bool,
    state_tx: Option<watch::Sender<SchedulerState>>,
    state_rx: watch::Receiver<SchedulerState>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RollupScheduler {
    pub fn new(
        store: SharedStore,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
        catch_up: bool,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        Self {
            store,
            clock,
            poll_interval,
            catch_up,
            state_tx: Some(state_tx),
            state_rx,
            cancel_token: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Records today as the last seen day and spawns the polling loop.
    pub fn start(&mut self) {
        let Some(state_tx) = self.state_tx.take() else {
            // Already running, or stopped for good.
            return;
        };

        let cursor = DayCursor::new(self.store.clone(), self.clock.clone(), self.catch_up);
        info!(
            last_seen = %cursor.last_seen(),
            poll_interval_secs = self.poll_interval.as_secs(),
            catch_up = self.catch_up,
            "Rollup scheduler started"
        );

        self.handle = Some(tokio::spawn(run(
            cursor,
            self.poll_interval,
            state_tx,
            self.cancel_token.clone(),
        )));
    }

    /// Signals the loop and waits for an in-flight rollup to finish.
    pub async fn stop(&mut self) {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Rollup scheduler task failed to join");
            }
        } else if let Some(state_tx) = self.state_tx.take() {
            state_tx.send_replace(SchedulerState::Stopped);
        }
    }
}

async fn run(
    mut cursor: DayCursor,
    poll_interval: Duration,
    state: watch::Sender<SchedulerState>,
    cancel_token: CancellationToken,
) {
    loop {
        // Stop requests are honoured between iterations, never mid-rollup.
        if cancel_token.is_cancelled() {
            break;
        }

        cursor.poll(&state).await;

        tokio::select! {
            _ = time::sleep(poll_interval) => {}
            _ = cancel_token.cancelled() => break,
        }
    }

    state.send_replace(SchedulerState::Stopped);
    info!("Rollup scheduler stopped");
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::{
        clock::{local, ManualClock},
        db::models::{NewProperty, NewRealtimeReading, SensorKind},
        store::{flaky::FlakyStore, MemoryReadingStore, ReadingStore},
    };

    fn march(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn store_with_day(days: &[u32]) -> MemoryReadingStore {
        let store = MemoryReadingStore::new();
        store
            .insert_property(&NewProperty {
                name: "Modern Condo".into(),
                address: String::new(),
                description: String::new(),
                image_url: None,
            })
            .await
            .unwrap();
        for d in days {
            store
                .insert_realtime(&NewRealtimeReading {
                    property_id: 1,
                    sensor_kind: SensorKind::Temperature,
                    value: 22.0,
                    recorded_at: local(2024, 3, *d, 10, 0),
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn same_day_poll_does_nothing() {
        let store = store_with_day(&[1]).await;
        let clock = ManualClock::new(local(2024, 3, 1, 10, 0));
        let mut cursor = DayCursor::new(Arc::new(store.clone()), Arc::new(clock.clone()), false);
        let (tx, rx) = watch::channel(SchedulerState::Idle);

        clock.advance(ChronoDuration::hours(13));
        assert!(cursor.poll(&tx).await.is_empty());
        assert_eq!(cursor.last_seen(), march(1));
        assert_eq!(*rx.borrow(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn rollover_migrates_the_previous_day() {
        let store = store_with_day(&[1]).await;
        let clock = ManualClock::new(local(2024, 3, 1, 23, 55));
        let mut cursor = DayCursor::new(Arc::new(store.clone()), Arc::new(clock.clone()), false);
        let (tx, _rx) = watch::channel(SchedulerState::Idle);

        clock.set(local(2024, 3, 2, 0, 0));
        let outcomes = cursor.poll(&tx).await;
        assert_eq!(outcomes.len(), 1);
        let report = outcomes[0].as_ref().unwrap();
        assert_eq!(report.day, march(1));
        assert_eq!(report.historical_written, 1);
        assert_eq!(report.realtime_deleted, 1);
        assert_eq!(cursor.last_seen(), march(2));
    }

    #[tokio::test]
    async fn skipped_days_are_not_migrated_without_catch_up() {
        let store = store_with_day(&[1, 2]).await;
        let clock = ManualClock::new(local(2024, 3, 1, 12, 0));
        let mut cursor = DayCursor::new(Arc::new(store.clone()), Arc::new(clock.clone()), false);
        let (tx, _rx) = watch::channel(SchedulerState::Idle);

        clock.set(local(2024, 3, 3, 1, 0));
        let outcomes = cursor.poll(&tx).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(cursor.last_seen(), march(3));

        let history = store.history(1, &SensorKind::ALL, march(1)).await.unwrap();
        let days: Vec<_> = history.iter().map(|h| h.day).collect();
        assert_eq!(days, vec![march(1)]);
        assert!(store.latest(1, SensorKind::Temperature).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn catch_up_drains_every_skipped_day_in_order() {
        let store = store_with_day(&[1, 2]).await;
        let clock = ManualClock::new(local(2024, 3, 1, 12, 0));
        let mut cursor = DayCursor::new(Arc::new(store.clone()), Arc::new(clock.clone()), true);
        let (tx, _rx) = watch::channel(SchedulerState::Idle);

        clock.set(local(2024, 3, 3, 1, 0));
        let outcomes = cursor.poll(&tx).await;
        let days: Vec<_> = outcomes.iter().map(|o| o.as_ref().unwrap().day).collect();
        assert_eq!(days, vec![march(1), march(2)]);
        assert!(store.latest(1, SensorKind::Temperature).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_rollup_still_advances_and_is_not_retried() {
        let inner = store_with_day(&[1]).await;
        let store = FlakyStore::new(inner.clone());
        store.fail_writes(true);
        let clock = ManualClock::new(local(2024, 3, 1, 23, 55));
        let mut cursor = DayCursor::new(Arc::new(store), Arc::new(clock.clone()), false);
        let (tx, rx) = watch::channel(SchedulerState::Idle);

        clock.set(local(2024, 3, 2, 0, 5));
        let outcomes = cursor.poll(&tx).await;
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], Err(MigrationError::WriteHistorical { .. })));
        assert_eq!(cursor.last_seen(), march(2));
        assert_eq!(*rx.borrow(), SchedulerState::Idle);

        clock.advance(ChronoDuration::hours(1));
        assert!(cursor.poll(&tx).await.is_empty());
        assert!(inner.history(1, &SensorKind::ALL, march(1)).await.unwrap().is_empty());
        assert!(inner.latest(1, SensorKind::Temperature).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn clock_moving_backwards_only_resets_cursor() {
        let store = store_with_day(&[1]).await;
        let clock = ManualClock::new(local(2024, 3, 2, 0, 30));
        let mut cursor = DayCursor::new(Arc::new(store.clone()), Arc::new(clock.clone()), false);
        let (tx, _rx) = watch::channel(SchedulerState::Idle);

        clock.set(local(2024, 3, 1, 23, 0));
        assert!(cursor.poll(&tx).await.is_empty());
        assert_eq!(cursor.last_seen(), march(1));
        assert!(store.latest(1, SensorKind::Temperature).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_rolls_over_on_next_poll_and_stops() {
        let store = store_with_day(&[1]).await;
        let clock = ManualClock::new(local(2024, 3, 1, 23, 58));
        let mut scheduler = RollupScheduler::new(
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
            Duration::from_secs(300),
            false,
        );

        scheduler.start();
        scheduler.start();
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(store.history(1, &SensorKind::ALL, march(1)).await.unwrap().is_empty());

        clock.set(local(2024, 3, 2, 0, 1));
        time::sleep(Duration::from_secs(300)).await;

        let history = store.history(1, &SensorKind::ALL, march(1)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].avg_value, Some(22.0));

        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        scheduler.stop().await;
        scheduler.start();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn stop_before_start_is_terminal() {
        let store = MemoryReadingStore::new();
        let clock = ManualClock::new(local(2024, 3, 1, 0, 0));
        let mut scheduler = RollupScheduler::new(
            Arc::new(store),
            Arc::new(clock),
            Duration::from_secs(300),
            false,
        );
        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }
}
