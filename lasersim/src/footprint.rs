use tracing::trace;

use crate::{
    pose::{Pose, Size},
    traits::{Layer, OccupancyQuery},
};

/// Keeps a sensor's own rectangle out of the layer it scans while it scans.
///
/// The footprint is removed at the pose it was last registered at, and
/// registered again at the sensor's current pose afterwards.
#[derive(Debug, Clone)]
pub struct SelfFootprintMapper {
    size: Size,
    layer: Layer,
    transparent: bool,
    mapped_at: Option<Pose>,
}

impl SelfFootprintMapper {
    pub fn new(size: Size, layer: Layer, transparent: bool) -> Self {
        Self {
            size,
            layer,
            transparent,
            mapped_at: None,
        }
    }

    /// A transparent sensor never registers a footprint.
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Pose the footprint is currently registered at.
    pub fn mapped_at(&self) -> Option<&Pose> {
        self.mapped_at.as_ref()
    }

    pub fn unmap<W>(&mut self, world: &mut W)
    where
        W: OccupancyQuery + ?Sized,
    {
        if self.transparent {
            return;
        }
        if let Some(pose) = self.mapped_at.take() {
            trace!(?pose, "unmapping footprint");
            world.set_footprint(&pose, &self.size, self.layer, false);
        }
    }

    pub fn remap<W>(&mut self, world: &mut W, pose: &Pose)
    where
        W: OccupancyQuery + ?Sized,
    {
        if self.transparent {
            return;
        }
        trace!(?pose, "mapping footprint");
        world.set_footprint(pose, &self.size, self.layer, true);
        self.mapped_at = Some(*pose);
    }
}
