use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    wire::{centidegrees_to_radians, ConfigRequest},
};

pub const DEFAULT_RESOLUTION: u16 = 50;
pub const DEFAULT_MIN_ANGLE: i16 = -9000;
pub const DEFAULT_MAX_ANGLE: i16 = 9000;
pub const DEFAULT_SAMPLE_COUNT: usize = 361;
pub const DEFAULT_RANGE_MIN: f64 = 0.0;
pub const DEFAULT_RANGE_MAX: f64 = 8.0;

/// Hardware limit (centidegrees) imposed on the fine resolution bucket.
pub const FINE_ANGLE_LIMIT: i16 = 5000;
/// Angular limit (centidegrees) beyond which medium/coarse requests draw a warning.
pub const WIDE_ANGLE_LIMIT: i16 = 9000;

/// Angular resolutions the emulated hardware accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionBucket {
    /// 0.25 degrees.
    Fine,
    /// 0.5 degrees.
    Medium,
    /// 1 degree.
    Coarse,
}

impl ResolutionBucket {
    pub fn classify(centidegrees: u16) -> Option<Self> {
        match centidegrees {
            25 => Some(Self::Fine),
            50 => Some(Self::Medium),
            100 => Some(Self::Coarse),
            _ => None,
        }
    }
}

/// How an accepted request was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigOutcome {
    /// Applied as requested.
    Applied,
    /// Fine bucket: the angles were clamped to [`FINE_ANGLE_LIMIT`].
    RangeAdjusted {
        requested: (i16, i16),
        applied: (i16, i16),
    },
    /// Medium/coarse bucket: the angles exceed [`WIDE_ANGLE_LIMIT`] but were
    /// kept as requested.
    RangeWarning { min_angle: i16, max_angle: i16 },
}

/// Validated range-finder configuration.
///
/// Angles are held in centidegrees, the unit the hardware is configured in,
/// so that the sample count is exact.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanConfig {
    resolution: u16,
    min_angle: i16,
    max_angle: i16,
    sample_count: usize,
    range_min: f64,
    range_max: f64,
    reflectance: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            min_angle: DEFAULT_MIN_ANGLE,
            max_angle: DEFAULT_MAX_ANGLE,
            sample_count: DEFAULT_SAMPLE_COUNT,
            range_min: DEFAULT_RANGE_MIN,
            range_max: DEFAULT_RANGE_MAX,
            reflectance: false,
        }
    }
}

impl ScanConfig {
    /// Default angular configuration with the given range limits.
    pub fn with_range_limits(range_min: f64, range_max: f64) -> Result<Self> {
        let valid = range_min >= 0.0
            && range_min <= range_max
            && range_max > 0.0
            && range_max.is_finite();
        if !valid {
            return Err(Error::InvalidRangeLimits {
                range_min,
                range_max,
            });
        }
        Ok(Self {
            range_min,
            range_max,
            ..Default::default()
        })
    }

    /// Validates and applies a request.
    ///
    /// On error the configuration is left untouched.
    pub fn apply(&mut self, request: &ConfigRequest) -> Result<ConfigOutcome> {
        let Some(bucket) = ResolutionBucket::classify(request.resolution) else {
            warn!(
                resolution = request.resolution,
                "invalid laser configuration request"
            );
            return Err(Error::ConfigRejected {
                resolution: request.resolution,
            });
        };

        let (min_angle, max_angle, outcome) = match bucket {
            ResolutionBucket::Fine => {
                let min_angle = request.min_angle.clamp(-FINE_ANGLE_LIMIT, FINE_ANGLE_LIMIT);
                let max_angle = request.max_angle.clamp(-FINE_ANGLE_LIMIT, FINE_ANGLE_LIMIT);
                let outcome = if (min_angle, max_angle) == (request.min_angle, request.max_angle)
                {
                    ConfigOutcome::Applied
                } else {
                    debug!(
                        requested_min = request.min_angle,
                        requested_max = request.max_angle,
                        min_angle,
                        max_angle,
                        "clamped fine resolution scan to hardware limit"
                    );
                    ConfigOutcome::RangeAdjusted {
                        requested: (request.min_angle, request.max_angle),
                        applied: (min_angle, max_angle),
                    }
                };
                (min_angle, max_angle, outcome)
            }
            // Out-of-limit angles are kept here, unlike the fine bucket.
            ResolutionBucket::Medium | ResolutionBucket::Coarse => {
                let limit = WIDE_ANGLE_LIMIT.unsigned_abs();
                let outcome = if request.min_angle.unsigned_abs() > limit
                    || request.max_angle.unsigned_abs() > limit
                {
                    warn!(
                        min_angle = request.min_angle,
                        max_angle = request.max_angle,
                        "invalid laser configuration request: angles exceed hardware limit"
                    );
                    ConfigOutcome::RangeWarning {
                        min_angle: request.min_angle,
                        max_angle: request.max_angle,
                    }
                } else {
                    ConfigOutcome::Applied
                };
                (request.min_angle, request.max_angle, outcome)
            }
        };

        let sample_count = sample_count(min_angle, max_angle, request.resolution)
            .ok_or_else(|| {
                warn!(min_angle, max_angle, "inverted laser configuration request");
                Error::InvalidAngleRange {
                    min_angle,
                    max_angle,
                }
            })?;

        self.resolution = request.resolution;
        self.min_angle = min_angle;
        self.max_angle = max_angle;
        self.sample_count = sample_count;
        self.reflectance = request.reflectance;
        Ok(outcome)
    }

    /// Decodes a raw config frame and applies it.
    pub fn apply_bytes(&mut self, frame: &[u8]) -> Result<ConfigOutcome> {
        self.apply(&ConfigRequest::decode(frame)?)
    }

    /// Restores the hardware defaults. Range limits are a property of the
    /// device, not of the request, and are kept.
    pub fn reset_to_default(&mut self) {
        *self = Self {
            range_min: self.range_min,
            range_max: self.range_max,
            ..Default::default()
        };
    }

    pub fn is_default(&self) -> bool {
        self.resolution == DEFAULT_RESOLUTION
            && self.min_angle == DEFAULT_MIN_ANGLE
            && self.max_angle == DEFAULT_MAX_ANGLE
            && !self.reflectance
    }

    /// The request that reproduces this configuration.
    pub fn to_request(&self) -> ConfigRequest {
        ConfigRequest {
            resolution: self.resolution,
            min_angle: self.min_angle,
            max_angle: self.max_angle,
            reflectance: self.reflectance,
        }
    }

    /// Bearing of sample `index`, relative to the sensor heading (radians).
    pub fn bearing(&self, index: usize) -> f64 {
        self.min_angle() + index as f64 * self.resolution()
    }

    /// Angular resolution in radians.
    pub fn resolution(&self) -> f64 {
        centidegrees_to_radians(self.resolution.into())
    }

    pub fn min_angle(&self) -> f64 {
        centidegrees_to_radians(self.min_angle.into())
    }

    pub fn max_angle(&self) -> f64 {
        centidegrees_to_radians(self.max_angle.into())
    }

    pub fn resolution_centidegrees(&self) -> u16 {
        self.resolution
    }

    pub fn min_angle_centidegrees(&self) -> i16 {
        self.min_angle
    }

    pub fn max_angle_centidegrees(&self) -> i16 {
        self.max_angle
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn range_min(&self) -> f64 {
        self.range_min
    }

    pub fn range_max(&self) -> f64 {
        self.range_max
    }

    pub fn reflectance(&self) -> bool {
        self.reflectance
    }
}

/// `floor((max - min) / resolution) + 1`, or `None` for an inverted range.
fn sample_count(min_angle: i16, max_angle: i16, resolution: u16) -> Option<usize> {
    let span = i32::from(max_angle) - i32::from(min_angle);
    if span < 0 || resolution == 0 {
        return None;
    }
    Some((span / i32::from(resolution)) as usize + 1)
}
