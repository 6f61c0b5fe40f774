//! Fakes shared by the collection tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::{ProviderError, StoreError};
use crate::models::{MeasurementResult, Provider};
use crate::providers::SpeedProvider;
use crate::storage::ResultStore;

pub enum Behavior {
    Succeed(MeasurementResult),
    Fail(String),
    Panic,
}

/// Provider with scripted behavior that records when each call started
pub struct FakeProvider {
    provider: Provider,
    behavior: Behavior,
    delay: Duration,
    blocking: bool,
    starts: Arc<Mutex<Vec<Instant>>>,
}

impl FakeProvider {
    pub fn succeeding(provider: Provider, download: f64, upload: f64, latency: f64) -> Self {
        let result = MeasurementResult::new(
            provider,
            format!("{provider} test server"),
            download,
            upload,
            latency,
            format!(r#"{{"download": {download}, "upload": {upload}, "ping": {latency}}}"#),
        );
        Self::with_behavior(provider, Behavior::Succeed(result))
    }

    pub fn failing(provider: Provider, cause: &str) -> Self {
        Self::with_behavior(provider, Behavior::Fail(cause.to_string()))
    }

    pub fn panicking(provider: Provider) -> Self {
        Self::with_behavior(provider, Behavior::Panic)
    }

    fn with_behavior(provider: Provider, behavior: Behavior) -> Self {
        Self {
            provider,
            behavior,
            delay: Duration::ZERO,
            blocking: false,
            starts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Async delay before the scripted behavior
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Blocks the executing thread instead of yielding
    pub fn blocking_for(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self.blocking = true;
        self
    }

    pub fn starts(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.starts)
    }

    pub fn into_arc(self) -> Arc<dyn SpeedProvider> {
        Arc::new(self)
    }
}

#[async_trait]
impl SpeedProvider for FakeProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn measure(&self) -> Result<MeasurementResult, ProviderError> {
        self.starts.lock().unwrap().push(Instant::now());

        if !self.delay.is_zero() {
            if self.blocking {
                std::thread::sleep(self.delay);
            } else {
                tokio::time::sleep(self.delay).await;
            }
        }

        match &self.behavior {
            Behavior::Succeed(result) => Ok(result.clone()),
            Behavior::Fail(cause) => Err(ProviderError::new(self.provider, cause.clone())),
            Behavior::Panic => panic!("{} probe exploded", self.provider),
        }
    }
}

/// In-memory store recording every save and close
#[derive(Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<MeasurementResult>>,
    save_calls: AtomicUsize,
    close_calls: AtomicUsize,
    fail_saves: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let store = Self::default();
        store.fail_saves.store(true, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<MeasurementResult> {
        self.saved.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl ResultStore for RecordingStore {
    fn save(&self, result: &MeasurementResult) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("database is locked")));
        }
        self.saved.lock().unwrap().push(result.clone());
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
