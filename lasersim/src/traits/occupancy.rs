use auto_impl::auto_impl;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pose::{Pose, Size};

/// Something occupies the cell.
pub const CELL_OCCUPIED: u8 = 0x01;
/// The occupant returns a bright (reflective) laser echo.
pub const CELL_BRIGHT: u8 = 0x02;
/// A sensor footprint is registered in the cell.
pub const CELL_FOOTPRINT: u8 = 0x04;
/// Bits used by collaborators for their own bookkeeping ("sticky" bits).
/// They make a cell non-empty but never affect reflectance.
pub const CELL_STICKY: u8 = 0x70;
/// Bits considered when classifying a return as reflective.
pub const REFLECTANCE_MASK: u8 = !CELL_STICKY;

/// A partition of the spatial grid, queried and mutated independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Layer {
    /// What physical bodies collide with.
    Obstacle,
    /// What laser range-finders see.
    Laser,
}

impl Layer {
    pub(crate) fn index(self) -> usize {
        match self {
            Layer::Obstacle => 0,
            Layer::Laser => 1,
        }
    }
}

/// Bitmask-indexed occupancy lookup.
#[auto_impl(&mut, Box)]
pub trait OccupancyQuery {
    /// Size of one grid cell (meters). Used as the ray-marching step.
    fn resolution(&self) -> f64;

    /// Occupancy bits of the cell containing `(x, y)`. Zero means empty,
    /// including everywhere outside the grid.
    fn probe(&self, x: f64, y: f64, layer: Layer) -> u8;

    /// Registers (`present == true`) or removes a rectangular sensor
    /// footprint centered on `pose`.
    fn set_footprint(&mut self, pose: &Pose, size: &Size, layer: Layer, present: bool);
}

/// Returns `true` when a combined probe value reads as a bright return.
pub fn is_reflective(cell: u8) -> bool {
    cell & REFLECTANCE_MASK == CELL_BRIGHT
}
