#![doc = include_str!("../README.md")]

use lasersim::{
    LaserScan2D, Layer, LineTraversal, ModelTree, OccupancyQuery, OccupantId, OccupantIndex,
    Point2, Pose, PoseProvider, Reflectivity, Scan2D, ScanObserver, ScanResult, Size,
    SubscriptionSource,
};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct Tracing<T>(T);

impl<T> Tracing<T> {
    pub fn new(v: T) -> Self {
        Self(v)
    }

    pub fn get_ref(&self) -> &T {
        &self.0
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Tracing<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: PoseProvider> PoseProvider for Tracing<T> {
    fn local_to_global(&self, local: &Pose) -> Pose {
        let global = self.0.local_to_global(local);
        trace!(
            method = "lasersim::PoseProvider::local_to_global",
            local_x = local.x,
            local_y = local.y,
            local_theta = local.theta,
            global_x = global.x,
            global_y = global.y,
            global_theta = global.theta,
        );
        global
    }
}

impl<T: SubscriptionSource> SubscriptionSource for Tracing<T> {
    fn subscriber_count(&self) -> usize {
        let count = self.0.subscriber_count();
        trace!(method = "lasersim::SubscriptionSource::subscriber_count", count);
        count
    }
}

impl<T: OccupancyQuery> OccupancyQuery for Tracing<T> {
    fn resolution(&self) -> f64 {
        self.0.resolution()
    }

    fn probe(&self, x: f64, y: f64, layer: Layer) -> u8 {
        let cell = self.0.probe(x, y, layer);
        trace!(method = "lasersim::OccupancyQuery::probe", x, y, ?layer, cell);
        cell
    }

    fn set_footprint(&mut self, pose: &Pose, size: &Size, layer: Layer, present: bool) {
        trace!(
            method = "lasersim::OccupancyQuery::set_footprint",
            pose_x = pose.x,
            pose_y = pose.y,
            pose_theta = pose.theta,
            size_x = size.x,
            size_y = size.y,
            ?layer,
            present,
        );
        self.0.set_footprint(pose, size, layer, present)
    }
}

impl<T: OccupantIndex> OccupantIndex for Tracing<T> {
    fn traverse(
        &self,
        origin: Point2<f64>,
        bearing: f64,
        max_range: f64,
    ) -> Box<dyn LineTraversal + '_> {
        trace!(
            method = "lasersim::OccupantIndex::traverse",
            origin_x = origin.x,
            origin_y = origin.y,
            bearing,
            max_range,
        );
        self.0.traverse(origin, bearing, max_range)
    }
}

impl<T: ModelTree> ModelTree for Tracing<T> {
    fn is_related(&self, a: OccupantId, b: OccupantId) -> bool {
        let related = self.0.is_related(a, b);
        trace!(
            method = "lasersim::ModelTree::is_related",
            a = a.0,
            b = b.0,
            related
        );
        related
    }

    fn reflectivity(&self, occupant: OccupantId) -> Reflectivity {
        let reflectivity = self.0.reflectivity(occupant);
        trace!(
            method = "lasersim::ModelTree::reflectivity",
            occupant = occupant.0,
            ?reflectivity
        );
        reflectivity
    }
}

impl<T: ScanObserver> ScanObserver for Tracing<T> {
    fn on_scan(&self, scan: &ScanResult) {
        trace!(
            method = "lasersim::ScanObserver::on_scan",
            timestamp = scan.timestamp(),
            sample_count = scan.len(),
        );
        self.0.on_scan(scan)
    }

    fn on_invalidate(&self) {
        trace!(method = "lasersim::ScanObserver::on_invalidate");
        self.0.on_invalidate()
    }
}

impl<T: LaserScan2D> LaserScan2D for Tracing<T> {
    fn current_scan(&self) -> Result<Scan2D, lasersim::Error> {
        let scan = self.0.current_scan()?;
        trace!(
            method = "lasersim::LaserScan2D::current_scan",
            angle_min = scan.angle_min,
            angle_max = scan.angle_max,
            ?scan.ranges,
        );
        Ok(scan)
    }
}
