use std::collections::{HashMap, HashSet};

use anyhow::format_err;
use nalgebra::Point2;

use super::grid_world::{cell_coordinate, covered_cells};
use crate::{
    error::{Error, Result},
    pose::{Pose, Size},
    traits::{LineTraversal, ModelTree, OccupantId, OccupantIndex, Reflectivity},
};

#[derive(Debug, Clone)]
struct Model {
    parent: Option<OccupantId>,
    reflectivity: Reflectivity,
    cells: Vec<(i64, i64)>,
}

/// Sparse world that records which models occupy each cell of an unbounded
/// grid, and how models are nested.
#[derive(Debug, Clone)]
pub struct OccupantWorld {
    resolution: f64,
    models: Vec<Model>,
    cells: HashMap<(i64, i64), Vec<OccupantId>>,
}

impl OccupantWorld {
    pub fn new(resolution: f64) -> Result<Self> {
        if !(resolution > 0.0 && resolution.is_finite()) {
            return Err(Error::Other(format_err!(
                "invalid grid resolution {resolution}"
            )));
        }
        Ok(Self {
            resolution,
            models: Vec::new(),
            cells: HashMap::new(),
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Registers a model. It occupies no space until [`place`](Self::place)d.
    pub fn add_model(
        &mut self,
        parent: Option<OccupantId>,
        reflectivity: Reflectivity,
    ) -> Result<OccupantId> {
        if let Some(parent) = parent {
            self.check(parent)?;
        }
        self.models.push(Model {
            parent,
            reflectivity,
            cells: Vec::new(),
        });
        Ok(OccupantId(self.models.len() - 1))
    }

    pub fn parent(&self, id: OccupantId) -> Option<OccupantId> {
        self.models.get(id.0).and_then(|m| m.parent)
    }

    /// Moves `id` so that it covers a rectangle of `size` centered on `pose`.
    pub fn place(&mut self, id: OccupantId, pose: &Pose, size: &Size) -> Result<()> {
        self.remove(id)?;
        let cells = covered_cells(pose, size, (0.0, 0.0), self.resolution, None);
        for cell in &cells {
            self.cells.entry(*cell).or_default().push(id);
        }
        self.models[id.0].cells = cells;
        Ok(())
    }

    /// Takes `id` out of the grid. The model itself stays registered.
    pub fn remove(&mut self, id: OccupantId) -> Result<()> {
        self.check(id)?;
        for cell in std::mem::take(&mut self.models[id.0].cells) {
            if let Some(occupants) = self.cells.get_mut(&cell) {
                occupants.retain(|o| *o != id);
                if occupants.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
        Ok(())
    }

    /// Models registered in the cell containing `point`.
    pub fn occupants_at(&self, point: Point2<f64>) -> &[OccupantId] {
        let cell = (
            cell_coordinate(point.x, self.resolution),
            cell_coordinate(point.y, self.resolution),
        );
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or_default()
    }

    fn check(&self, id: OccupantId) -> Result<()> {
        if id.0 < self.models.len() {
            Ok(())
        } else {
            Err(Error::Other(format_err!("unknown occupant {id:?}")))
        }
    }

    fn is_ancestor(&self, ancestor: OccupantId, mut id: OccupantId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }
}

impl OccupantIndex for OccupantWorld {
    fn traverse(
        &self,
        origin: Point2<f64>,
        bearing: f64,
        max_range: f64,
    ) -> Box<dyn LineTraversal + '_> {
        Box::new(GridTraversal::new(self, origin, bearing, max_range))
    }
}

impl ModelTree for OccupantWorld {
    fn is_related(&self, a: OccupantId, b: OccupantId) -> bool {
        self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    fn reflectivity(&self, occupant: OccupantId) -> Reflectivity {
        self.models
            .get(occupant.0)
            .map(|m| m.reflectivity)
            .unwrap_or_default()
    }
}

/// Walks the cells pierced by a ray in order (Amanatides and Woo), yielding
/// every occupant the first time it is met.
#[derive(Debug)]
struct GridTraversal<'a> {
    world: &'a OccupantWorld,
    cell: (i64, i64),
    step: (i64, i64),
    next_boundary: (f64, f64),
    delta: (f64, f64),
    max_range: f64,
    entry: f64,
    range: f64,
    started: bool,
    pending: Vec<OccupantId>,
    seen: HashSet<OccupantId>,
}

impl<'a> GridTraversal<'a> {
    fn new(world: &'a OccupantWorld, origin: Point2<f64>, bearing: f64, max_range: f64) -> Self {
        let res = world.resolution;
        let (sin, cos) = bearing.sin_cos();
        let cell = (
            cell_coordinate(origin.x, res),
            cell_coordinate(origin.y, res),
        );
        let axis = |o: f64, c: i64, d: f64| -> (i64, f64, f64) {
            if d > 0.0 {
                (1, ((c + 1) as f64 * res - o) / d, res / d)
            } else if d < 0.0 {
                (-1, (c as f64 * res - o) / d, -res / d)
            } else {
                (0, f64::INFINITY, f64::INFINITY)
            }
        };
        let (sx, bx, dx) = axis(origin.x, cell.0, cos);
        let (sy, by, dy) = axis(origin.y, cell.1, sin);
        Self {
            world,
            cell,
            step: (sx, sy),
            next_boundary: (bx, by),
            delta: (dx, dy),
            max_range,
            entry: 0.0,
            range: 0.0,
            started: false,
            pending: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Moves to the next cell. Returns `false` once past `max_range`.
    fn advance(&mut self) -> bool {
        if self.next_boundary.0 < self.next_boundary.1 {
            self.entry = self.next_boundary.0;
            self.cell.0 += self.step.0;
            self.next_boundary.0 += self.delta.0;
        } else {
            self.entry = self.next_boundary.1;
            self.cell.1 += self.step.1;
            self.next_boundary.1 += self.delta.1;
        }
        self.entry <= self.max_range && self.max_range.is_finite()
    }

    fn load(&mut self) {
        if let Some(occupants) = self.world.cells.get(&self.cell) {
            // reversed so that pop() preserves insertion order
            for id in occupants.iter().rev() {
                if !self.seen.contains(id) {
                    self.pending.push(*id);
                }
            }
            self.seen.extend(occupants.iter().copied());
        }
    }
}

impl Iterator for GridTraversal<'_> {
    type Item = OccupantId;

    fn next(&mut self) -> Option<OccupantId> {
        loop {
            if let Some(id) = self.pending.pop() {
                self.range = self.entry;
                return Some(id);
            }
            if self.started {
                if !self.advance() {
                    return None;
                }
            } else {
                self.started = true;
            }
            self.load();
        }
    }
}

impl LineTraversal for GridTraversal<'_> {
    fn range(&self) -> f64 {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn world() -> OccupantWorld {
        OccupantWorld::new(0.1).unwrap()
    }

    #[test]
    fn test_place_and_remove() {
        let mut world = world();
        let box_ = world.add_model(None, Reflectivity::Opaque).unwrap();
        world.place(box_, &Pose::new(1.0, 1.0, 0.0), &Size::new(0.3, 0.3)).unwrap();
        assert_eq!(world.occupants_at(Point2::new(1.0, 1.0)), &[box_]);

        world.place(box_, &Pose::new(3.0, 1.0, 0.0), &Size::new(0.3, 0.3)).unwrap();
        assert!(world.occupants_at(Point2::new(1.0, 1.0)).is_empty());
        assert_eq!(world.occupants_at(Point2::new(3.0, 1.0)), &[box_]);

        world.remove(box_).unwrap();
        assert!(world.occupants_at(Point2::new(3.0, 1.0)).is_empty());
        assert!(world.place(OccupantId(9), &Pose::default(), &Size::default()).is_err());
    }

    #[test]
    fn test_model_tree() {
        let mut world = world();
        let robot = world.add_model(None, Reflectivity::Opaque).unwrap();
        let laser = world.add_model(Some(robot), Reflectivity::Opaque).unwrap();
        let bumper = world.add_model(Some(laser), Reflectivity::Bright).unwrap();
        let wall = world.add_model(None, Reflectivity::Opaque).unwrap();
        assert!(world.is_related(laser, laser));
        assert!(world.is_related(laser, robot));
        assert!(world.is_related(laser, bumper));
        assert!(world.is_related(bumper, robot));
        assert!(!world.is_related(laser, wall));
        assert_eq!(world.reflectivity(bumper), Reflectivity::Bright);
        assert_eq!(world.reflectivity(OccupantId(42)), Reflectivity::Opaque);
        assert!(world.add_model(Some(OccupantId(42)), Reflectivity::Opaque).is_err());
    }

    #[test]
    fn test_traversal_order_and_range() {
        let mut world = world();
        let near = world.add_model(None, Reflectivity::Opaque).unwrap();
        let far = world.add_model(None, Reflectivity::Opaque).unwrap();
        world.place(far, &Pose::new(3.05, 0.05, 0.0), &Size::new(0.1, 0.1)).unwrap();
        world.place(near, &Pose::new(1.05, 0.05, 0.0), &Size::new(0.1, 0.1)).unwrap();

        let mut cursor = world.traverse(Point2::new(0.05, 0.05), 0.0, 8.0);
        assert_eq!(cursor.next(), Some(near));
        assert_approx_eq!(cursor.range(), 0.95);
        assert_eq!(cursor.next(), Some(far));
        assert_approx_eq!(cursor.range(), 2.95);
        assert_eq!(cursor.next(), None);

        // looking the other way
        let mut cursor = world.traverse(Point2::new(0.05, 0.05), PI, 8.0);
        assert_eq!(cursor.next(), None);
        // out of reach
        let mut cursor = world.traverse(Point2::new(0.05, 0.05), 0.0, 2.0);
        assert_eq!(cursor.next(), Some(near));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_traversal_diagonal_and_vertical() {
        let mut world = world();
        let post = world.add_model(None, Reflectivity::Opaque).unwrap();
        world.place(post, &Pose::new(1.05, 1.05, 0.0), &Size::new(0.1, 0.1)).unwrap();

        let mut cursor = world.traverse(Point2::new(0.05, 0.05), FRAC_PI_4, 8.0);
        assert_eq!(cursor.next(), Some(post));
        assert!(cursor.range() > 1.2 && cursor.range() < 1.42, "{}", cursor.range());

        let mut cursor = world.traverse(Point2::new(1.05, -1.0), FRAC_PI_2, 8.0);
        assert_eq!(cursor.next(), Some(post));
        assert_approx_eq!(cursor.range(), 2.0);
    }

    #[test]
    fn test_traversal_yields_each_occupant_once() {
        let mut world = world();
        let wall = world.add_model(None, Reflectivity::Opaque).unwrap();
        world.place(wall, &Pose::new(2.0, 0.05, 0.0), &Size::new(1.0, 0.1)).unwrap();
        let hits: Vec<_> = world.traverse(Point2::new(0.05, 0.05), 0.0, 8.0).collect();
        assert_eq!(hits, vec![wall]);
    }

    #[test]
    fn test_origin_cell_has_zero_range() {
        let mut world = world();
        let me = world.add_model(None, Reflectivity::Opaque).unwrap();
        world.place(me, &Pose::new(0.05, 0.05, 0.0), &Size::new(0.1, 0.1)).unwrap();
        let mut cursor = world.traverse(Point2::new(0.05, 0.05), 1.0, 8.0);
        assert_eq!(cursor.next(), Some(me));
        assert_eq!(cursor.range(), 0.0);
    }

    #[test]
    fn test_unbounded_traversal_stops_at_origin_cell() {
        let mut world = world();
        let me = world.add_model(None, Reflectivity::Opaque).unwrap();
        let wall = world.add_model(None, Reflectivity::Opaque).unwrap();
        world.place(me, &Pose::new(0.05, 0.05, 0.0), &Size::new(0.1, 0.1)).unwrap();
        world.place(wall, &Pose::new(2.0, 0.05, 0.0), &Size::new(0.1, 1.0)).unwrap();
        let hits: Vec<_> = world
            .traverse(Point2::new(0.05, 0.05), 0.0, f64::INFINITY)
            .collect();
        assert_eq!(hits, vec![me]);
    }
}
