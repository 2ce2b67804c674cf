use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{config::ScanConfig, scan::ScanResult, traits::ScanObserver};

/// Nominal sweep rate of the emulated hardware: 360 readings per 0.2 s.
pub const DEFAULT_UPDATE_RATE: f64 = 360.0 / 0.2;

/// Latest committed scan, replaced wholesale at the end of an accepted cycle.
pub struct ScanChannel {
    update_rate: f64,
    last_update: f64,
    published: Option<Arc<ScanResult>>,
    observers: Vec<Arc<dyn ScanObserver>>,
}

impl fmt::Debug for ScanChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanChannel")
            .field("update_rate", &self.update_rate)
            .field("last_update", &self.last_update)
            .field("published", &self.published.as_ref().map(|s| s.timestamp()))
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for ScanChannel {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_RATE)
    }
}

impl ScanChannel {
    /// `update_rate` is in readings per second.
    pub fn new(update_rate: f64) -> Self {
        Self {
            update_rate,
            last_update: 0.0,
            published: None,
            observers: Vec::new(),
        }
    }

    pub fn update_rate(&self) -> f64 {
        self.update_rate
    }

    /// Simulated time of the last committed scan.
    pub fn last_update(&self) -> f64 {
        self.last_update
    }

    /// Duration of one full sweep with `config`.
    pub fn interval(&self, config: &ScanConfig) -> f64 {
        config.sample_count() as f64 / self.update_rate
    }

    /// Whether a sweep has elapsed since the last committed scan.
    pub fn is_due(&self, now: f64, config: &ScanConfig) -> bool {
        now - self.last_update > self.interval(config)
    }

    pub fn add_observer(&mut self, observer: Arc<dyn ScanObserver>) {
        self.observers.push(observer);
    }

    /// Publishes `scan`, replacing the previous one, and notifies observers.
    pub fn commit(&mut self, now: f64, scan: ScanResult) -> Arc<ScanResult> {
        let scan = Arc::new(scan);
        self.last_update = now;
        self.published = Some(scan.clone());
        for observer in &self.observers {
            observer.on_scan(&scan);
        }
        scan
    }

    /// Withdraws the published scan. Readers see "no data", not stale data.
    pub fn invalidate(&mut self) {
        if self.published.take().is_some() {
            debug!("published scan invalidated");
            for observer in &self.observers {
                observer.on_invalidate();
            }
        }
    }

    pub fn latest(&self) -> Option<Arc<ScanResult>> {
        self.published.clone()
    }
}
