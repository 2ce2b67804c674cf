use std::{collections::VecDeque, sync::Arc};

use nalgebra::Point2;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    channel::{ScanChannel, DEFAULT_UPDATE_RATE},
    config::{ConfigOutcome, ScanConfig, DEFAULT_RANGE_MAX, DEFAULT_RANGE_MIN},
    error::{Error, Result},
    footprint::SelfFootprintMapper,
    pose::{Geometry, Pose},
    scan::ScanResult,
    scanner::RayCastScanner,
    traits::{
        LaserScan2D, Layer, ModelTree, OccupancyQuery, OccupantId, OccupantIndex, PoseProvider,
        Scan2D, ScanObserver, SubscriptionSource,
    },
    wire::ConfigRequest,
};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LaserSensorConfig {
    pub name: String,
    #[serde(default = "default_range_min")]
    pub range_min: f64,
    #[serde(default = "default_range_max")]
    pub range_max: f64,
    /// Transparent sensors are invisible to other range-finders.
    #[serde(default)]
    pub transparent: bool,
    /// Readings per second.
    #[serde(default = "default_update_rate")]
    pub update_rate: f64,
    /// Angular resolution of the world (radians). When set, only rays this far
    /// apart are cast and the samples in between are replicated.
    #[serde(default)]
    pub world_angular_resolution: Option<f64>,
    /// Mounting pose on the parent body and footprint extent.
    #[serde(default)]
    pub geometry: Geometry,
}

impl Default for LaserSensorConfig {
    fn default() -> Self {
        Self {
            name: "laser".into(),
            range_min: default_range_min(),
            range_max: default_range_max(),
            transparent: false,
            update_rate: default_update_rate(),
            world_angular_resolution: None,
            geometry: Geometry::default(),
        }
    }
}

fn default_range_min() -> f64 {
    DEFAULT_RANGE_MIN
}

fn default_range_max() -> f64 {
    DEFAULT_RANGE_MAX
}

fn default_update_rate() -> f64 {
    DEFAULT_UPDATE_RATE
}

/// What a call to [`LaserSensor::update`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nobody is subscribed; config reset and published scan withdrawn.
    Unsubscribed,
    /// A sweep has not elapsed yet; the published scan is unchanged.
    Throttled,
    /// A new scan was committed.
    Published { sample_count: usize },
}

/// A simulated laser range-finder mounted on a parent body.
///
/// `P` resolves the parent's frame, `S` reports subscriber demand.
#[derive(Debug)]
pub struct LaserSensor<P, S> {
    name: String,
    geometry: Geometry,
    parent: P,
    subscriptions: S,
    occupant: Option<OccupantId>,
    config: ScanConfig,
    pending: VecDeque<Vec<u8>>,
    scanner: RayCastScanner,
    footprint: SelfFootprintMapper,
    channel: ScanChannel,
}

impl<P, S> LaserSensor<P, S>
where
    P: PoseProvider,
    S: SubscriptionSource,
{
    pub fn new(config: &LaserSensorConfig, parent: P, subscriptions: S) -> Result<Self> {
        if !(config.update_rate > 0.0 && config.update_rate.is_finite()) {
            return Err(Error::InvalidUpdateRate {
                update_rate: config.update_rate,
            });
        }
        Ok(Self {
            name: config.name.clone(),
            geometry: config.geometry,
            parent,
            subscriptions,
            occupant: None,
            config: ScanConfig::with_range_limits(config.range_min, config.range_max)?,
            pending: VecDeque::new(),
            scanner: RayCastScanner::new().with_interpolation(config.world_angular_resolution),
            footprint: SelfFootprintMapper::new(
                config.geometry.size,
                Layer::Laser,
                config.transparent,
            ),
            channel: ScanChannel::new(config.update_rate),
        })
    }

    /// Identity of this sensor in an occupant-indexed world, used to ignore
    /// itself and its relatives.
    pub fn with_occupant(mut self, occupant: OccupantId) -> Self {
        self.occupant = Some(occupant);
        self
    }

    /// Replaces the scanner, e.g. to change its buffer capacity.
    pub fn with_scanner(mut self, scanner: RayCastScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.channel.add_observer(observer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scanner(&self) -> &RayCastScanner {
        &self.scanner
    }

    pub fn footprint(&self) -> &SelfFootprintMapper {
        &self.footprint
    }

    pub fn occupant(&self) -> Option<OccupantId> {
        self.occupant
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    pub fn subscriptions(&self) -> &S {
        &self.subscriptions
    }

    /// Pose of the sensor in the global frame.
    pub fn global_pose(&self) -> Pose {
        self.parent.local_to_global(&self.geometry.pose)
    }

    /// Queues a raw config frame. It is validated and applied at the start of
    /// the next subscribed update.
    pub fn submit_config(&mut self, frame: impl Into<Vec<u8>>) {
        self.pending.push_back(frame.into());
    }

    /// Validates and applies a request immediately.
    pub fn apply_config(&mut self, request: &ConfigRequest) -> Result<ConfigOutcome> {
        self.config.apply(request)
    }

    pub fn latest(&self) -> Option<Arc<ScanResult>> {
        self.channel.latest()
    }

    /// Global coordinates of the last scan's end points, for renderers.
    pub fn hit_points(&self) -> Option<Vec<Point2<f64>>> {
        self.channel.latest().map(|scan| scan.hit_points())
    }

    /// Runs one tick against a bitmask occupancy grid.
    ///
    /// The sensor's own footprint is kept out of the laser layer while
    /// casting, and is registered at the current pose once done, whether the
    /// cycle succeeded or not.
    pub fn update<W>(&mut self, now: f64, world: &mut W) -> Result<UpdateOutcome>
    where
        W: OccupancyQuery + ?Sized,
    {
        let pose = self.global_pose();
        self.footprint.unmap(world);
        let outcome = self.cycle(now, &pose, |scanner, origin, config| {
            scanner
                .scan_grid(origin, config, &*world, Layer::Laser)
                .map(|_| ())
        });
        self.footprint.remap(world, &pose);
        outcome
    }

    /// Runs one tick against an occupant-indexed world. The sensor, its
    /// ancestors and its descendants are ignored.
    pub fn update_occupants<I, M>(
        &mut self,
        now: f64,
        index: &I,
        models: &M,
    ) -> Result<UpdateOutcome>
    where
        I: OccupantIndex + ?Sized,
        M: ModelTree + ?Sized,
    {
        let pose = self.global_pose();
        let me = self.occupant;
        self.cycle(now, &pose, |scanner, origin, config| {
            scanner
                .scan_occupants(origin, config, index, models, |hit| {
                    me.is_some_and(|me| models.is_related(me, hit))
                })
                .map(|_| ())
        })
    }

    /// Removes the footprint from the world and withdraws the published scan.
    pub fn shutdown<W>(&mut self, world: &mut W)
    where
        W: OccupancyQuery + ?Sized,
    {
        self.footprint.unmap(world);
        self.channel.invalidate();
    }

    fn cycle<F>(&mut self, now: f64, origin: &Pose, cast: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&mut RayCastScanner, &Pose, &ScanConfig) -> Result<()>,
    {
        if !self.subscriptions.is_subscribed() {
            if !self.config.is_default() || self.channel.latest().is_some() {
                debug!(name = %self.name, "no subscribers; resetting laser");
            }
            self.config.reset_to_default();
            self.channel.invalidate();
            return Ok(UpdateOutcome::Unsubscribed);
        }

        self.apply_pending();

        if !self.channel.is_due(now, &self.config) {
            return Ok(UpdateOutcome::Throttled);
        }

        cast(&mut self.scanner, origin, &self.config)?;
        let scan = ScanResult::new(
            self.config.clone(),
            now,
            *origin,
            self.scanner.samples().to_vec(),
        );
        let sample_count = scan.len();
        self.channel.commit(now, scan);
        Ok(UpdateOutcome::Published { sample_count })
    }

    fn apply_pending(&mut self) {
        while let Some(frame) = self.pending.pop_front() {
            match self.config.apply_bytes(&frame) {
                Ok(outcome) => debug!(name = %self.name, ?outcome, "laser configuration applied"),
                Err(e) => warn!(name = %self.name, "ignoring laser configuration request: {e}"),
            }
        }
    }
}

impl<P, S> PoseProvider for LaserSensor<P, S>
where
    P: PoseProvider,
    S: SubscriptionSource,
{
    fn local_to_global(&self, local: &Pose) -> Pose {
        self.global_pose().compose(local)
    }
}

impl<P, S> LaserScan2D for LaserSensor<P, S>
where
    P: PoseProvider + Send + Sync,
    S: SubscriptionSource + Send + Sync,
{
    fn current_scan(&self) -> Result<Scan2D, Error> {
        self.channel
            .latest()
            .map(|scan| scan.to_scan_2d(self.channel.update_rate()))
            .ok_or_else(|| Error::NoScanAvailable {
                message: format!("{} has not published a scan", self.name),
            })
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::{
        clients::{
            FixedMount, GridWorld, GridWorldConfig, HitPointRecorder, OccupantWorld,
            Subscriptions,
        },
        pose::Size,
        traits::{Reflectivity, CELL_FOOTPRINT},
        wire::ConfigRequest,
    };

    fn grid() -> GridWorld {
        GridWorld::new(&GridWorldConfig {
            origin_x: -10.0,
            origin_y: -10.0,
            width: 20.0,
            height: 20.0,
            resolution: 0.05,
        })
        .unwrap()
    }

    fn sensor(subs: &Subscriptions) -> LaserSensor<FixedMount, Subscriptions> {
        LaserSensor::new(
            &LaserSensorConfig::default(),
            FixedMount::default(),
            subs.clone(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_range_limits() {
        let config = LaserSensorConfig {
            range_min: 5.0,
            range_max: 1.0,
            ..Default::default()
        };
        let result = LaserSensor::new(&config, FixedMount::default(), Subscriptions::new(1));
        assert!(matches!(result, Err(Error::InvalidRangeLimits { .. })));

        let config: LaserSensorConfig = toml::from_str("name = \"a\"\nrange_max = inf").unwrap();
        assert!(config.range_max.is_infinite());
        let result = LaserSensor::new(&config, FixedMount::default(), Subscriptions::new(1));
        assert!(matches!(result, Err(Error::InvalidRangeLimits { .. })));
    }

    #[test]
    fn test_new_rejects_bad_update_rate() {
        for update_rate in [0.0, -1800.0, f64::NAN, f64::INFINITY] {
            let config = LaserSensorConfig {
                update_rate,
                ..Default::default()
            };
            let result = LaserSensor::new(&config, FixedMount::default(), Subscriptions::new(1));
            assert!(
                matches!(result, Err(Error::InvalidUpdateRate { .. })),
                "{update_rate}"
            );
        }
    }

    #[test]
    fn test_wall_straight_ahead() {
        let mut world = grid();
        world.add_obstacle(
            &Pose::new(5.5, 0.0, 0.0),
            &Size::new(1.0, 6.0),
            Reflectivity::Opaque,
        );
        let subs = Subscriptions::new(1);
        let mut laser = sensor(&subs);
        assert_eq!(
            laser.update(1.0, &mut world).unwrap(),
            UpdateOutcome::Published { sample_count: 361 }
        );
        let scan = laser.latest().unwrap();
        assert_eq!(scan.len(), 361);
        assert!((scan.samples()[180].range - 5.0).abs() <= 0.05 + 1e-9);
        // parallel to the wall
        assert_eq!(scan.samples()[0].range, 8.0);
        assert_eq!(scan.samples()[360].range, 8.0);
    }

    #[test]
    fn test_throttled_within_a_sweep() {
        let mut world = grid();
        let subs = Subscriptions::new(1);
        let mut laser = sensor(&subs);
        laser.update(1.0, &mut world).unwrap();
        let first = laser.latest().unwrap();
        // one sweep of 361 samples takes ~0.2 s
        assert_eq!(
            laser.update(1.1, &mut world).unwrap(),
            UpdateOutcome::Throttled
        );
        assert!(Arc::ptr_eq(&first, &laser.latest().unwrap()));
        assert!(matches!(
            laser.update(1.3, &mut world).unwrap(),
            UpdateOutcome::Published { .. }
        ));
        assert!(!Arc::ptr_eq(&first, &laser.latest().unwrap()));
    }

    #[test]
    fn test_unsubscribed_resets_and_invalidates() {
        let mut world = grid();
        let subs = Subscriptions::new(1);
        let recorder = Arc::new(HitPointRecorder::new());
        let mut laser = sensor(&subs).with_observer(recorder.clone());

        laser.submit_config(
            ConfigRequest {
                resolution: 100,
                min_angle: -4500,
                max_angle: 4500,
                reflectance: true,
            }
            .encode(),
        );
        laser.update(1.0, &mut world).unwrap();
        assert_eq!(laser.latest().unwrap().len(), 91);
        assert!(recorder.snapshot().is_some());

        subs.set(0);
        assert_eq!(
            laser.update(2.0, &mut world).unwrap(),
            UpdateOutcome::Unsubscribed
        );
        assert!(laser.latest().is_none());
        assert!(laser.hit_points().is_none());
        assert!(recorder.snapshot().is_none());
        assert!(laser.config().is_default());
        assert!(laser.current_scan().is_err());

        subs.subscribe();
        laser.update(3.0, &mut world).unwrap();
        assert_eq!(laser.latest().unwrap().len(), 361);
    }

    #[test]
    fn test_rejected_config_keeps_previous() {
        let mut world = grid();
        let subs = Subscriptions::new(1);
        let mut laser = sensor(&subs);
        laser.submit_config(
            ConfigRequest {
                resolution: 33,
                min_angle: -100,
                max_angle: 100,
                reflectance: false,
            }
            .encode(),
        );
        laser.submit_config(vec![0u8; 3]);
        laser.update(1.0, &mut world).unwrap();
        assert!(laser.config().is_default());
        assert_eq!(laser.latest().unwrap().len(), 361);
    }

    #[test]
    fn test_capacity_error_keeps_previous_scan() {
        let mut world = grid();
        let subs = Subscriptions::new(1);
        let mut laser = sensor(&subs).with_scanner(RayCastScanner::with_capacity(100));
        laser
            .apply_config(&ConfigRequest {
                resolution: 100,
                min_angle: -4500,
                max_angle: 4500,
                reflectance: false,
            })
            .unwrap();
        laser.update(1.0, &mut world).unwrap();
        let first = laser.latest().unwrap();

        laser
            .apply_config(&ScanConfig::default().to_request())
            .unwrap();
        let result = laser.update(2.0, &mut world);
        assert!(matches!(result, Err(Error::CapacityExceeded { .. })));
        assert!(Arc::ptr_eq(&first, &laser.latest().unwrap()));
        // the footprint is registered even though the cycle failed
        assert_ne!(world.probe(0.0, 0.0, Layer::Laser) & CELL_FOOTPRINT, 0);
    }

    #[test]
    fn test_own_footprint_is_invisible_to_self_but_not_to_others() {
        let mut world = grid();
        let subs = Subscriptions::new(1);
        let mut laser = sensor(&subs);
        laser.update(1.0, &mut world).unwrap();
        assert_ne!(world.probe(0.0, 0.0, Layer::Laser) & CELL_FOOTPRINT, 0);

        // next tick must not see its own footprint registered by the previous one
        laser.update(2.0, &mut world).unwrap();
        let scan = laser.latest().unwrap();
        assert!(scan.samples().iter().all(|s| s.range == 8.0));

        // a second laser two meters away, looking back at the first
        let other_config = LaserSensorConfig {
            name: "other".into(),
            ..Default::default()
        };
        let mut other = LaserSensor::new(
            &other_config,
            FixedMount(Pose::new(2.0, 0.0, std::f64::consts::PI)),
            subs.clone(),
        )
        .unwrap();
        other.update(2.0, &mut world).unwrap();
        let range = other.latest().unwrap().samples()[180].range;
        assert!(range > 1.8 && range < 2.0, "{range}");

        laser.shutdown(&mut world);
        assert_eq!(world.probe(0.0, 0.0, Layer::Laser) & CELL_FOOTPRINT, 0);
    }

    #[test]
    fn test_transparent_sensor_leaves_no_footprint() {
        let mut world = grid();
        let config = LaserSensorConfig {
            transparent: true,
            ..Default::default()
        };
        let mut laser =
            LaserSensor::new(&config, FixedMount::default(), Subscriptions::new(1)).unwrap();
        laser.update(1.0, &mut world).unwrap();
        assert_eq!(world.probe(0.0, 0.0, Layer::Laser), 0);
    }

    #[test]
    fn test_mount_offset() {
        let config = LaserSensorConfig {
            geometry: Geometry {
                pose: Pose::new(0.2, 0.0, 0.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let laser = LaserSensor::new(
            &config,
            FixedMount(Pose::new(1.0, 1.0, std::f64::consts::FRAC_PI_2)),
            Subscriptions::new(1),
        )
        .unwrap();
        let pose = laser.global_pose();
        assert_approx_eq!(pose.x, 1.0);
        assert_approx_eq!(pose.y, 1.2);
        let tip = laser.local_to_global(&Pose::new(0.1, 0.0, 0.0));
        assert_approx_eq!(tip.y, 1.3);
    }

    #[test]
    fn test_update_occupants_skips_relatives() {
        let mut world = OccupantWorld::new(0.05).unwrap();
        let robot = world.add_model(None, Reflectivity::Opaque).unwrap();
        let me = world.add_model(Some(robot), Reflectivity::Opaque).unwrap();
        let wall = world.add_model(None, Reflectivity::Bright).unwrap();
        world
            .place(robot, &Pose::new(0.0, 0.0, 0.0), &Size::new(0.6, 0.6))
            .unwrap();
        world
            .place(me, &Pose::new(0.0, 0.0, 0.0), &Size::new(0.155, 0.155))
            .unwrap();
        world
            .place(wall, &Pose::new(3.5, 0.0, 0.0), &Size::new(1.0, 8.0))
            .unwrap();

        let mut laser = LaserSensor::new(
            &LaserSensorConfig::default(),
            FixedMount::default(),
            Subscriptions::new(1),
        )
        .unwrap()
        .with_occupant(me);
        laser
            .apply_config(&ConfigRequest {
                resolution: 100,
                min_angle: -100,
                max_angle: 100,
                reflectance: true,
            })
            .unwrap();
        assert_eq!(
            laser.update_occupants(1.0, &world, &world).unwrap(),
            UpdateOutcome::Published { sample_count: 3 }
        );
        let scan = laser.latest().unwrap();
        let middle = scan.samples()[1];
        assert!((middle.range - 3.0).abs() <= 0.05 + 1e-9, "{middle:?}");
        assert!(middle.reflectant);

        let scan_2d = laser.current_scan().unwrap();
        assert_eq!(scan_2d.intensities, vec![1.0, 1.0, 1.0]);
    }
}
