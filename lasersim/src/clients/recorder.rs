use std::sync::Mutex;

use nalgebra::Point2;

use crate::{scan::ScanResult, traits::ScanObserver};

/// Keeps the global end points of the latest scan for visualization.
#[derive(Debug, Default)]
pub struct HitPointRecorder {
    points: Mutex<Option<Vec<Point2<f64>>>>,
}

impl HitPointRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// End points of the latest scan, `None` when nothing is published.
    pub fn snapshot(&self) -> Option<Vec<Point2<f64>>> {
        self.points.lock().unwrap().clone()
    }
}

impl ScanObserver for HitPointRecorder {
    fn on_scan(&self, scan: &ScanResult) {
        *self.points.lock().unwrap() = Some(scan.hit_points());
    }

    fn on_invalidate(&self) {
        *self.points.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::{config::ScanConfig, pose::Pose, scan::ScanSample};

    #[test]
    fn test_recorder() {
        let recorder = HitPointRecorder::new();
        assert!(recorder.snapshot().is_none());

        let config = ScanConfig::default();
        let samples = vec![
            ScanSample {
                range: 2.0,
                reflectant: false,
            };
            config.sample_count()
        ];
        let scan = ScanResult::new(config, 0.5, Pose::new(1.0, 0.0, 0.0), samples);
        recorder.on_scan(&scan);
        let points = recorder.snapshot().unwrap();
        assert_eq!(points.len(), 361);
        // the middle beam looks straight ahead
        assert_approx_eq!(points[180].x, 3.0);
        assert_approx_eq!(points[180].y, 0.0);

        recorder.on_invalidate();
        assert!(recorder.snapshot().is_none());
    }
}
