use nalgebra::Point2;

use crate::{
    config::ScanConfig,
    error::Result,
    pose::Pose,
    traits::Scan2D,
    wire::{encode_range, LaserData},
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScanSample {
    /// Meters, within `[range_min, range_max]` of the config that produced it.
    pub range: f64,
    pub reflectant: bool,
}

/// One committed sweep: the samples, the configuration that produced them,
/// where the sensor was and when.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanResult {
    config: ScanConfig,
    timestamp: f64,
    origin: Pose,
    samples: Vec<ScanSample>,
}

impl ScanResult {
    pub fn new(config: ScanConfig, timestamp: f64, origin: Pose, samples: Vec<ScanSample>) -> Self {
        debug_assert_eq!(config.sample_count(), samples.len());
        Self {
            config,
            timestamp,
            origin,
            samples,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Simulated time (seconds) the scan was taken at.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Global pose of the sensor when the scan was taken.
    pub fn origin(&self) -> &Pose {
        &self.origin
    }

    pub fn samples(&self) -> &[ScanSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Global coordinates of every sample's end point, in sample order.
    pub fn hit_points(&self) -> Vec<Point2<f64>> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, sample)| self.origin.point_at(self.config.bearing(i), sample.range))
            .collect()
    }

    pub fn to_data_frame(&self) -> LaserData {
        let reflectance = self.config.reflectance();
        LaserData {
            resolution: self.config.resolution_centidegrees(),
            min_angle: self.config.min_angle_centidegrees(),
            max_angle: self.config.max_angle_centidegrees(),
            ranges: self
                .samples
                .iter()
                .map(|s| encode_range(s.range, s.reflectant, reflectance))
                .collect(),
        }
    }

    /// Encodes the scan as a fixed-size data frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_data_frame().encode()
    }

    /// Converts to SI units. `update_rate` is the number of readings per second.
    pub fn to_scan_2d(&self, update_rate: f64) -> Scan2D {
        let intensities = if self.config.reflectance() {
            self.samples
                .iter()
                .map(|s| if s.reflectant { 1.0 } else { 0.0 })
                .collect()
        } else {
            vec![]
        };
        Scan2D {
            angle_min: self.config.min_angle(),
            angle_max: self.config.bearing(self.samples.len().saturating_sub(1)),
            angle_increment: self.config.resolution(),
            time_increment: 1.0 / update_rate,
            scan_time: self.samples.len() as f64 / update_rate,
            range_min: self.config.range_min(),
            range_max: self.config.range_max(),
            ranges: self.samples.iter().map(|s| s.range).collect(),
            intensities,
        }
    }
}
