use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(
        "lasersim: Config rejected: unsupported resolution {} (centidegrees)",
        resolution
    )]
    ConfigRejected { resolution: u16 },
    #[error(
        "lasersim: Invalid angle range: min = {}, max = {} (centidegrees)",
        min_angle,
        max_angle
    )]
    InvalidAngleRange { min_angle: i16, max_angle: i16 },
    #[error(
        "lasersim: Invalid range limits: min = {}, max = {}",
        range_min,
        range_max
    )]
    InvalidRangeLimits { range_min: f64, range_max: f64 },
    #[error("lasersim: Invalid update rate: {} (readings per second)", update_rate)]
    InvalidUpdateRate { update_rate: f64 },
    #[error(
        "lasersim: Capacity exceeded: {} samples requested, buffer holds {}",
        sample_count,
        capacity
    )]
    CapacityExceeded { sample_count: usize, capacity: usize },
    #[error(
        "lasersim: Wire length mismatch (expected = {}, actual = {})",
        expected,
        actual
    )]
    WireLength { expected: usize, actual: usize },
    #[error("lasersim: No scan available : {}", message)]
    NoScanAvailable { message: String },
    #[error("lasersim: Other: {:?}", .0)]
    Other(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
