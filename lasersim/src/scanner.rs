use tracing::{debug, trace};

use crate::{
    config::ScanConfig,
    error::{Error, Result},
    pose::Pose,
    scan::ScanSample,
    traits::{
        is_reflective, Layer, ModelTree, OccupancyQuery, OccupantId, OccupantIndex, Reflectivity,
    },
    wire::MAX_SAMPLES,
};

/// Ray-marching scanner.
///
/// Owns the sample buffer it writes into; the buffer is only resized when the
/// configured sample count changes.
#[derive(Debug, Clone)]
pub struct RayCastScanner {
    capacity: usize,
    world_angular_resolution: Option<f64>,
    buffer: Vec<ScanSample>,
}

impl Default for RayCastScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RayCastScanner {
    /// A scanner whose buffer holds as many samples as a data frame.
    pub fn new() -> Self {
        Self::with_capacity(MAX_SAMPLES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            world_angular_resolution: None,
            buffer: Vec::new(),
        }
    }

    /// Trades fidelity for speed: only rays spaced roughly
    /// `world_angular_resolution` radians apart are cast, and their values are
    /// replicated into the samples in between. `None` casts every ray.
    pub fn with_interpolation(mut self, world_angular_resolution: Option<f64>) -> Self {
        self.world_angular_resolution = world_angular_resolution;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples filled in by replication after each cast ray.
    pub fn skip(&self, config: &ScanConfig) -> usize {
        match self.world_angular_resolution {
            Some(world) => {
                let skip = (world / config.resolution() - 0.5).floor();
                if skip > 0.0 {
                    skip as usize
                } else {
                    0
                }
            }
            None => 0,
        }
    }

    /// Samples of the last completed scan.
    pub fn samples(&self) -> &[ScanSample] {
        &self.buffer
    }

    /// Scans a bitmask occupancy grid. The sensor's own footprint is expected
    /// to be absent from `layer`.
    pub fn scan_grid<W>(
        &mut self,
        origin: &Pose,
        config: &ScanConfig,
        world: &W,
        layer: Layer,
    ) -> Result<&[ScanSample]>
    where
        W: OccupancyQuery + ?Sized,
    {
        self.fill(config, |bearing| {
            cast_grid_ray(
                world,
                layer,
                origin,
                bearing,
                config.range_min(),
                config.range_max(),
            )
        })
    }

    /// Scans an occupant-indexed world, ignoring every occupant for which
    /// `excluded` returns `true`.
    pub fn scan_occupants<I, M, X>(
        &mut self,
        origin: &Pose,
        config: &ScanConfig,
        index: &I,
        models: &M,
        excluded: X,
    ) -> Result<&[ScanSample]>
    where
        I: OccupantIndex + ?Sized,
        M: ModelTree + ?Sized,
        X: Fn(OccupantId) -> bool,
    {
        self.fill(config, |bearing| {
            cast_occupant_ray(
                index,
                models,
                &excluded,
                origin,
                bearing,
                config.range_min(),
                config.range_max(),
            )
        })
    }

    fn fill<F>(&mut self, config: &ScanConfig, mut cast: F) -> Result<&[ScanSample]>
    where
        F: FnMut(f64) -> ScanSample,
    {
        let sample_count = config.sample_count();
        if sample_count > self.capacity {
            return Err(Error::CapacityExceeded {
                sample_count,
                capacity: self.capacity,
            });
        }
        if self.buffer.len() != sample_count {
            debug!(
                from = self.buffer.len(),
                to = sample_count,
                "resizing scan buffer"
            );
            self.buffer.resize(sample_count, ScanSample::default());
        }

        let stride = self.skip(config) + 1;
        let mut s = 0;
        while s < sample_count {
            let sample = cast(config.bearing(s));
            let end = (s + stride).min(sample_count);
            self.buffer[s..end].fill(sample);
            s = end;
        }
        trace!(sample_count, stride, "scan complete");
        Ok(&self.buffer)
    }
}

/// Marches one ray through `layer` of a bitmask grid.
///
/// Besides the point on the ray, each step also probes one step to the +x
/// and one step to the +y side of it, so that rays cannot slip diagonally
/// through gaps one cell wide.
pub fn cast_grid_ray<W>(
    world: &W,
    layer: Layer,
    origin: &Pose,
    bearing: f64,
    range_min: f64,
    range_max: f64,
) -> ScanSample
where
    W: OccupancyQuery + ?Sized,
{
    let step = world.resolution();
    if !(step > 0.0 && step.is_finite() && range_max.is_finite()) {
        return ScanSample {
            range: range_max,
            reflectant: false,
        };
    }
    let (sin, cos) = (origin.theta + bearing).sin_cos();

    let mut i = 0u32;
    let mut range = 0.0;
    while range < range_max {
        let px = origin.x + range * cos;
        let py = origin.y + range * sin;
        let cell = world.probe(px, py, layer)
            | world.probe(px + step, py, layer)
            | world.probe(px, py + step, layer);
        if cell != 0 {
            return ScanSample {
                range: range.max(range_min),
                reflectant: is_reflective(cell),
            };
        }
        i += 1;
        range = f64::from(i) * step;
    }
    ScanSample {
        range: range_max,
        reflectant: false,
    }
}

/// Walks one ray through an occupant-indexed world and stops at the first
/// occupant that is neither excluded nor transparent.
pub fn cast_occupant_ray<I, M, X>(
    index: &I,
    models: &M,
    excluded: X,
    origin: &Pose,
    bearing: f64,
    range_min: f64,
    range_max: f64,
) -> ScanSample
where
    I: OccupantIndex + ?Sized,
    M: ModelTree + ?Sized,
    X: Fn(OccupantId) -> bool,
{
    let mut cursor = index.traverse(origin.position(), origin.theta + bearing, range_max);
    while let Some(hit) = cursor.next() {
        if excluded(hit) {
            continue;
        }
        let reflectivity = models.reflectivity(hit);
        if reflectivity != Reflectivity::Transparent {
            return ScanSample {
                range: cursor.range().max(range_min).min(range_max),
                reflectant: reflectivity >= Reflectivity::Bright,
            };
        }
    }
    ScanSample {
        range: range_max,
        reflectant: false,
    }
}
