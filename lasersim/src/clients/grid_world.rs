use anyhow::format_err;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    pose::{Pose, Size},
    traits::{Layer, OccupancyQuery, Reflectivity, CELL_BRIGHT, CELL_FOOTPRINT, CELL_OCCUPIED},
};

/// Absorbs floating point noise so that a coordinate sitting exactly on a cell
/// boundary always lands in the cell above it.
const CELL_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GridWorldConfig {
    /// Global x coordinate of the grid's lower left corner.
    #[serde(default)]
    pub origin_x: f64,
    /// Global y coordinate of the grid's lower left corner.
    #[serde(default)]
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    /// Cell size (meters).
    #[serde(default = "default_resolution")]
    pub resolution: f64,
}

fn default_resolution() -> f64 {
    0.05
}

impl Default for GridWorldConfig {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            width: 10.0,
            height: 10.0,
            resolution: default_resolution(),
        }
    }
}

/// Dense bitmask occupancy grid with one byte per cell and layer.
#[derive(Debug, Clone)]
pub struct GridWorld {
    origin_x: f64,
    origin_y: f64,
    resolution: f64,
    cols: usize,
    rows: usize,
    layers: [Vec<u8>; 2],
}

impl GridWorld {
    pub fn new(config: &GridWorldConfig) -> Result<Self> {
        if !(config.resolution > 0.0 && config.resolution.is_finite()) {
            return Err(Error::Other(format_err!(
                "invalid grid resolution {}",
                config.resolution
            )));
        }
        if !(config.width > 0.0 && config.height > 0.0) {
            return Err(Error::Other(format_err!(
                "invalid grid extent {} x {}",
                config.width,
                config.height
            )));
        }
        let cols = (config.width / config.resolution - CELL_EPSILON).ceil() as usize;
        let rows = (config.height / config.resolution - CELL_EPSILON).ceil() as usize;
        debug!(cols, rows, resolution = config.resolution, "creating grid world");
        Ok(Self {
            origin_x: config.origin_x,
            origin_y: config.origin_y,
            resolution: config.resolution,
            cols,
            rows,
            layers: [vec![0; cols * rows], vec![0; cols * rows]],
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column and row of the cell containing `(x, y)`, `None` outside the grid.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = cell_coordinate(x - self.origin_x, self.resolution);
        let row = cell_coordinate(y - self.origin_y, self.resolution);
        if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
            return None;
        }
        Some((col as usize, row as usize))
    }

    pub fn cell(&self, col: usize, row: usize, layer: Layer) -> u8 {
        if col >= self.cols || row >= self.rows {
            return 0;
        }
        self.layers[layer.index()][row * self.cols + col]
    }

    /// Applies `f` to every cell covered by a rectangle of `size` centered on
    /// `pose` and rotated by its heading.
    pub fn fill_rect<F>(&mut self, pose: &Pose, size: &Size, layer: Layer, mut f: F)
    where
        F: FnMut(&mut u8),
    {
        let origin = (self.origin_x, self.origin_y);
        let bounds = (self.cols as i64, self.rows as i64);
        let cells = &mut self.layers[layer.index()];
        for (col, row) in covered_cells(pose, size, origin, self.resolution, Some(bounds)) {
            f(&mut cells[(row * bounds.0 + col) as usize]);
        }
    }

    /// Adds a rectangular obstacle. It always blocks the obstacle layer, and
    /// is visible in the laser layer unless transparent.
    pub fn add_obstacle(&mut self, pose: &Pose, size: &Size, reflectivity: Reflectivity) {
        self.fill_rect(pose, size, Layer::Obstacle, |c| *c |= CELL_OCCUPIED);
        let bits = match reflectivity {
            Reflectivity::Transparent => return,
            Reflectivity::Opaque => CELL_OCCUPIED,
            Reflectivity::Bright => CELL_BRIGHT,
        };
        self.fill_rect(pose, size, Layer::Laser, |c| *c |= bits);
    }
}

impl OccupancyQuery for GridWorld {
    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn probe(&self, x: f64, y: f64, layer: Layer) -> u8 {
        match self.cell_at(x, y) {
            Some((col, row)) => self.cell(col, row, layer),
            None => 0,
        }
    }

    fn set_footprint(&mut self, pose: &Pose, size: &Size, layer: Layer, present: bool) {
        if present {
            self.fill_rect(pose, size, layer, |c| *c |= CELL_FOOTPRINT);
        } else {
            self.fill_rect(pose, size, layer, |c| *c &= !CELL_FOOTPRINT);
        }
    }
}

pub(crate) fn cell_coordinate(offset: f64, resolution: f64) -> i64 {
    (offset / resolution + CELL_EPSILON).floor() as i64
}

/// Cells (column, row), relative to `origin`, whose centers lie inside the
/// rotated rectangle. The cell holding the rectangle's center is always
/// included, so that rectangles smaller than a cell still occupy one.
///
/// With `bounds = Some((cols, rows))` only cells in `[0, cols) x [0, rows)`
/// are visited.
pub(crate) fn covered_cells(
    pose: &Pose,
    size: &Size,
    origin: (f64, f64),
    resolution: f64,
    bounds: Option<(i64, i64)>,
) -> Vec<(i64, i64)> {
    let (sin, cos) = pose.theta.sin_cos();
    let (hx, hy) = (size.x / 2.0, size.y / 2.0);
    let ex = hx * cos.abs() + hy * sin.abs();
    let ey = hx * sin.abs() + hy * cos.abs();

    let mut col0 = cell_coordinate(pose.x - ex - origin.0, resolution);
    let mut col1 = cell_coordinate(pose.x + ex - origin.0, resolution);
    let mut row0 = cell_coordinate(pose.y - ey - origin.1, resolution);
    let mut row1 = cell_coordinate(pose.y + ey - origin.1, resolution);
    let center = (
        cell_coordinate(pose.x - origin.0, resolution),
        cell_coordinate(pose.y - origin.1, resolution),
    );

    let mut cells = vec![];
    match bounds {
        Some((cols, rows)) => {
            col0 = col0.max(0);
            row0 = row0.max(0);
            col1 = col1.min(cols - 1);
            row1 = row1.min(rows - 1);
            if (0..cols).contains(&center.0) && (0..rows).contains(&center.1) {
                cells.push(center);
            }
        }
        None => cells.push(center),
    }
    for row in row0..=row1 {
        for col in col0..=col1 {
            if (col, row) == center {
                continue;
            }
            let dx = origin.0 + (col as f64 + 0.5) * resolution - pose.x;
            let dy = origin.1 + (row as f64 + 0.5) * resolution - pose.y;
            let lx = dx * cos + dy * sin;
            let ly = -dx * sin + dy * cos;
            if lx.abs() <= hx && ly.abs() <= hy {
                cells.push((col, row));
            }
        }
    }
    cells
}
