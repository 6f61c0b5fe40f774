//! Tests for the fixed-rate scheduler
//!
//! Timing tests run on tokio's paused clock so intervals of minutes finish
//! instantly and start times can be compared exactly.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::collectors::cycle::CycleRunner;
    use crate::collectors::scheduler::{Scheduler, SchedulerState};
    use crate::collectors::shutdown::StopSignal;
    use crate::collectors::tests::support::{FakeProvider, RecordingStore};
    use crate::models::{Provider, ValidationBounds};
    use crate::providers::SpeedProvider;
    use crate::storage::ResultStore;

    const INTERVAL: Duration = Duration::from_secs(600);

    fn scheduler(
        providers: Vec<Arc<dyn SpeedProvider>>,
        store: &Arc<RecordingStore>,
        stop: StopSignal,
    ) -> Scheduler {
        let store: Arc<dyn ResultStore> = store.clone();
        let runner = CycleRunner::new(providers, store, ValidationBounds::default());
        Scheduler::new(INTERVAL, runner, stop)
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_cycles_start_one_interval_apart() {
        let store = RecordingStore::new();
        let provider = FakeProvider::succeeding(Provider::FastCom, 100.0, 0.0, 0.0)
            .with_delay(Duration::from_secs(45));
        let starts = provider.starts();

        let mut scheduler = scheduler(vec![provider.into_arc()], &store, StopSignal::new()).with_max_cycles(4);
        let report = scheduler.run().await.unwrap();

        assert_eq!(report.cycles, 4);
        let starts = starts.lock().unwrap().clone();
        assert_eq!(starts.len(), 4);
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= INTERVAL, "cycle started early: {gap:?}");
            assert!(gap < INTERVAL + Duration::from_millis(50), "cycle started late: {gap:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycles_run_back_to_back() {
        let store = RecordingStore::new();
        let cycle_time = Duration::from_secs(900);
        let provider = FakeProvider::succeeding(Provider::Speedtest, 100.0, 10.0, 5.0).with_delay(cycle_time);
        let starts = provider.starts();

        let mut scheduler = scheduler(vec![provider.into_arc()], &store, StopSignal::new()).with_max_cycles(3);
        scheduler.run().await.unwrap();

        let starts = starts.lock().unwrap().clone();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            let gap = pair[1] - pair[0];
            // No wait after an overrun, and no catch-up burst either
            assert!(gap >= cycle_time);
            assert!(gap < cycle_time + Duration::from_millis(50), "unexpected wait: {gap:?}");
        }
    }

    #[tokio::test]
    async fn test_stop_before_start_runs_no_cycles() {
        let store = RecordingStore::new();
        let stop = StopSignal::new();
        stop.request_stop();

        let mut scheduler = scheduler(
            vec![FakeProvider::succeeding(Provider::FastCom, 1.0, 0.0, 0.0).into_arc()],
            &store,
            stop,
        );
        let report = scheduler.run().await.unwrap();

        assert_eq!(report.cycles, 0);
        assert_eq!(store.save_calls(), 0);
        assert_eq!(store.close_calls(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_interrupts_wait_between_cycles() {
        let store = RecordingStore::new();
        let stop = StopSignal::new();

        let mut scheduler = scheduler(
            vec![FakeProvider::succeeding(Provider::FastCom, 1.0, 0.0, 0.0).into_arc()],
            &store,
            stop.clone(),
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        let handle = tokio::spawn(async move {
            let report = scheduler.run().await;
            (report, scheduler.state())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.request_stop();

        let (report, state) = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop without waiting for the interval")
            .unwrap();

        assert_eq!(report.unwrap().cycles, 1);
        assert_eq!(state, SchedulerState::Stopped);
        assert_eq!(store.close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_cycle_finishes_before_stopping() {
        let store = RecordingStore::new();
        let stop = StopSignal::new();

        let mut scheduler = scheduler(
            vec![
                FakeProvider::succeeding(Provider::Speedtest, 50.0, 5.0, 5.0)
                    .with_delay(Duration::from_secs(30))
                    .into_arc(),
            ],
            &store,
            stop.clone(),
        );

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            stop.request_stop();
        });

        let report = scheduler.run().await.unwrap();
        stopper.await.unwrap();

        assert_eq!(report.cycles, 1);
        assert_eq!(report.stored, 1);
        assert_eq!(store.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failures_do_not_stop_the_scheduler() {
        let store = RecordingStore::new();
        let mut scheduler = scheduler(
            vec![
                FakeProvider::failing(Provider::FastCom, "HTTP 503").into_arc(),
                FakeProvider::succeeding(Provider::Speedtest, 80.0, 8.0, 8.0).into_arc(),
            ],
            &store,
            StopSignal::new(),
        )
        .with_max_cycles(3);

        let report = scheduler.run().await.unwrap();

        assert_eq!(report.cycles, 3);
        assert_eq!(report.provider_failures, 3);
        assert_eq!(report.stored, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_store_failures_stop_the_scheduler() {
        let store = RecordingStore::failing();
        let provider = FakeProvider::succeeding(Provider::FastCom, 100.0, 0.0, 0.0);
        let starts = provider.starts();

        let mut scheduler = scheduler(vec![provider.into_arc()], &store, StopSignal::new())
            .with_store_failure_limit(3)
            .with_max_cycles(10);

        let result = scheduler.run().await;

        assert!(result.is_err());
        assert_eq!(starts.lock().unwrap().len(), 3);
        assert_eq!(store.close_calls(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_recovery_resets_failure_count() {
        let store = RecordingStore::failing();
        let provider = FakeProvider::succeeding(Provider::FastCom, 100.0, 0.0, 0.0)
            .with_delay(Duration::from_secs(1));

        let mut scheduler = scheduler(vec![provider.into_arc()], &store, StopSignal::new())
            .with_store_failure_limit(2)
            .with_max_cycles(4);

        // Recover between the first and second cycle
        let recovering = Arc::clone(&store);
        let recovery = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(300)).await;
            recovering.set_failing(false);
        });

        let report = scheduler.run().await.unwrap();
        recovery.await.unwrap();

        assert_eq!(report.cycles, 4);
        assert_eq!(report.store_failures, 1);
        assert_eq!(report.stored, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_limit_zero_never_gives_up() {
        let store = RecordingStore::failing();
        let mut scheduler = scheduler(
            vec![FakeProvider::succeeding(Provider::FastCom, 100.0, 0.0, 0.0).into_arc()],
            &store,
            StopSignal::new(),
        )
        .with_store_failure_limit(0)
        .with_max_cycles(5);

        let report = scheduler.run().await.unwrap();
        assert_eq!(report.cycles, 5);
        assert_eq!(report.store_failures, 5);
    }

    #[tokio::test]
    async fn test_scheduler_cannot_run_twice() {
        let store = RecordingStore::new();
        let mut scheduler = scheduler(vec![], &store, StopSignal::new()).with_max_cycles(1);

        assert!(scheduler.run().await.is_ok());
        assert!(scheduler.run().await.is_err());
        assert_eq!(store.close_calls(), 1);
    }
}
