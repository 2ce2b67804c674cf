use auto_impl::auto_impl;

use crate::error::Error;

/// A scan in SI units, as handed to consumers that do not speak the wire format.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan2D {
    /// The angle (in radians) of the first sample, relative to the sensor heading.
    pub angle_min: f64,
    /// The angle (in radians) of the last sample, relative to the sensor heading.
    pub angle_max: f64,
    /// The angular difference (in radians) between consecutive samples.
    pub angle_increment: f64,
    /// The time difference (in seconds) between consecutive measurements.
    pub time_increment: f64,
    /// The time (in seconds) it takes for the laser to complete one scan.
    pub scan_time: f64,
    /// The minimum range (in meters) of valid distance measurements.
    pub range_min: f64,
    /// The maximum range (in meters) of valid distance measurements.
    pub range_max: f64,
    /// Distance measurements (in meters), one per sample.
    pub ranges: Vec<f64>,
    /// Reflectance per sample (1.0 for bright returns), empty when reflectance
    /// reporting is disabled.
    pub intensities: Vec<f64>,
}

#[auto_impl(Box, Arc)]
pub trait LaserScan2D: Send + Sync {
    fn current_scan(&self) -> Result<Scan2D, Error>;
}
