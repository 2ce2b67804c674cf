use auto_impl::auto_impl;
use nalgebra::Point2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identifies a model (body, sensor, obstacle) in an occupant-indexed world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccupantId(pub usize);

/// How an occupant responds to a laser beam. Ordered from least to most visible.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum Reflectivity {
    /// The beam passes through.
    Transparent,
    /// The beam stops, returning a plain range.
    #[default]
    Opaque,
    /// The beam stops, returning a range flagged as reflective.
    Bright,
}

/// Incremental cursor walking a ray through an occupant-indexed world.
///
/// Yields candidate occupants in non-decreasing range order. Dropping the
/// cursor releases it.
pub trait LineTraversal: Iterator<Item = OccupantId> {
    /// Distance travelled from the origin to the cell holding the most
    /// recently yielded occupant.
    fn range(&self) -> f64;
}

#[auto_impl(&, Box, Arc)]
pub trait OccupantIndex {
    fn traverse(
        &self,
        origin: Point2<f64>,
        bearing: f64,
        max_range: f64,
    ) -> Box<dyn LineTraversal + '_>;
}

/// Model-tree bookkeeping the scanner needs.
#[auto_impl(&, Box, Arc)]
pub trait ModelTree {
    /// `true` when `a` and `b` are the same model, or one is an ancestor of the other.
    fn is_related(&self, a: OccupantId, b: OccupantId) -> bool;

    fn reflectivity(&self, occupant: OccupantId) -> Reflectivity;
}
