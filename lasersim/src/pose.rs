use nalgebra::{Isometry2, Point2, Vector2};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Footprint of the default laser turret (meters).
pub const DEFAULT_FOOTPRINT: Size = Size { x: 0.155, y: 0.155 };

/// Position and heading in a 2D frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Pose {
    /// X position in meters.
    pub x: f64,
    /// Y position in meters.
    pub y: f64,
    /// Heading in radians, counter-clockwise from the X axis.
    #[serde(default)]
    pub theta: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.x, self.y), self.theta)
    }

    pub fn from_isometry(iso: &Isometry2<f64>) -> Self {
        Self {
            x: iso.translation.x,
            y: iso.translation.y,
            theta: iso.rotation.angle(),
        }
    }

    /// Expresses `local`, given in this pose's frame, in the frame this pose
    /// itself is expressed in.
    pub fn compose(&self, local: &Pose) -> Pose {
        Self::from_isometry(&(self.to_isometry() * local.to_isometry()))
    }

    /// Point at `range` meters along `bearing`, relative to this pose's heading.
    pub fn point_at(&self, bearing: f64, range: f64) -> Point2<f64> {
        let (sin, cos) = (self.theta + bearing).sin_cos();
        Point2::new(self.x + range * cos, self.y + range * sin)
    }
}

impl From<Isometry2<f64>> for Pose {
    fn from(iso: Isometry2<f64>) -> Self {
        Self::from_isometry(&iso)
    }
}

impl From<Pose> for Isometry2<f64> {
    fn from(pose: Pose) -> Self {
        pose.to_isometry()
    }
}

/// Extent of a rectangle along its own x and y axes (meters).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Size {
    pub x: f64,
    pub y: f64,
}

impl Size {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Mounting offset relative to the parent body, and footprint extent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Geometry {
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "default_footprint")]
    pub size: Size,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            pose: Pose::default(),
            size: DEFAULT_FOOTPRINT,
        }
    }
}

fn default_footprint() -> Size {
    DEFAULT_FOOTPRINT
}

/// Converts a body-local pose to the global frame, given the global pose of
/// the body it is attached to.
pub fn local_to_global(parent: &Pose, local: &Pose) -> Pose {
    parent.compose(local)
}
