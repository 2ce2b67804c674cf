use anyhow::format_err;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    sensor::{LaserSensor, UpdateOutcome},
    traits::{ModelTree, OccupancyQuery, OccupantIndex, PoseProvider, SubscriptionSource},
};

/// Simulated clock driving a set of sensors.
///
/// Each tick advances time by a fixed step and updates every sensor in
/// order. A failing sensor is reported but does not stop the others.
#[derive(Debug, Clone)]
pub struct Simulation {
    time: f64,
    dt: f64,
    ticks: u64,
}

impl Simulation {
    /// `dt` is the duration of one tick in seconds.
    pub fn new(dt: f64) -> Result<Self> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(Error::Other(format_err!("invalid time step {dt}")));
        }
        Ok(Self {
            time: 0.0,
            dt,
            ticks: 0,
        })
    }

    /// Current simulated time (seconds).
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances the clock by one step and returns the new time.
    pub fn advance(&mut self) -> f64 {
        self.ticks += 1;
        self.time = self.ticks as f64 * self.dt;
        self.time
    }

    /// Advances the clock and updates every sensor against a bitmask grid.
    pub fn tick<W, P, S>(
        &mut self,
        world: &mut W,
        sensors: &mut [LaserSensor<P, S>],
    ) -> Vec<Result<UpdateOutcome>>
    where
        W: OccupancyQuery + ?Sized,
        P: PoseProvider,
        S: SubscriptionSource,
    {
        let now = self.advance();
        debug!(tick = self.ticks, time = now, "simulation tick");
        sensors
            .iter_mut()
            .map(|sensor| {
                let result = sensor.update(now, world);
                report(sensor.name(), result)
            })
            .collect()
    }

    /// Advances the clock and updates every sensor against an
    /// occupant-indexed world.
    pub fn tick_occupants<I, M, P, S>(
        &mut self,
        index: &I,
        models: &M,
        sensors: &mut [LaserSensor<P, S>],
    ) -> Vec<Result<UpdateOutcome>>
    where
        I: OccupantIndex + ?Sized,
        M: ModelTree + ?Sized,
        P: PoseProvider,
        S: SubscriptionSource,
    {
        let now = self.advance();
        debug!(tick = self.ticks, time = now, "simulation tick");
        sensors
            .iter_mut()
            .map(|sensor| {
                let result = sensor.update_occupants(now, index, models);
                report(sensor.name(), result)
            })
            .collect()
    }
}

fn report(name: &str, result: Result<UpdateOutcome>) -> Result<UpdateOutcome> {
    if let Err(e) = &result {
        warn!(name, "laser update failed: {e}");
    }
    result
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::{
        clients::{FixedMount, GridWorld, GridWorldConfig, OccupantWorld, Subscriptions},
        pose::{Pose, Size},
        scanner::RayCastScanner,
        sensor::LaserSensorConfig,
        traits::Reflectivity,
        wire::ConfigRequest,
    };

    #[test]
    fn test_new_rejects_bad_step() {
        assert!(Simulation::new(0.0).is_err());
        assert!(Simulation::new(f64::NAN).is_err());
    }

    #[test]
    fn test_advance() {
        let mut sim = Simulation::new(0.1).unwrap();
        for _ in 0..10 {
            sim.advance();
        }
        assert_eq!(sim.ticks(), 10);
        assert_approx_eq!(sim.time(), 1.0);
    }

    #[test]
    fn test_tick_cadence_and_isolation() {
        let mut world = GridWorld::new(&GridWorldConfig::default()).unwrap();
        let subs = Subscriptions::new(1);
        let make = |name: &str| {
            LaserSensor::new(
                &LaserSensorConfig {
                    name: name.into(),
                    ..Default::default()
                },
                FixedMount(Pose::new(5.0, 5.0, 0.0)),
                subs.clone(),
            )
            .unwrap()
        };
        let broken = make("broken").with_scanner(RayCastScanner::with_capacity(10));
        let mut sensors = vec![broken, make("healthy")];

        let mut sim = Simulation::new(0.1).unwrap();
        let mut published = 0;
        let mut failed = 0;
        for _ in 0..20 {
            let results = sim.tick(&mut world, &mut sensors);
            assert_eq!(results.len(), 2);
            if results[0].is_err() {
                failed += 1;
            }
            if let Ok(UpdateOutcome::Published { .. }) = results[1] {
                published += 1;
            }
        }
        // a 361 sample sweep takes ~0.2 s, so at most every third 0.1 s tick
        assert!((6..=7).contains(&published), "{published}");
        // a failed cycle does not restart the sweep, so it is retried every tick
        assert!(failed >= 17, "{failed}");
        assert!(sensors[0].latest().is_none());

        sensors[1]
            .apply_config(&ConfigRequest {
                resolution: 100,
                min_angle: -100,
                max_angle: 100,
                reflectance: false,
            })
            .unwrap();
        let before = sensors[1].latest().unwrap().timestamp();
        let results = sim.tick(&mut world, &mut sensors);
        assert!(matches!(
            results[1],
            Ok(UpdateOutcome::Published { sample_count: 3 })
        ));
        assert!(sensors[1].latest().unwrap().timestamp() > before);
    }

    #[test]
    fn test_tick_occupants() {
        let mut world = OccupantWorld::new(0.05).unwrap();
        let front_id = world.add_model(None, Reflectivity::Opaque).unwrap();
        let wall = world.add_model(None, Reflectivity::Opaque).unwrap();
        world
            .place(front_id, &Pose::new(0.0, 0.0, 0.0), &Size::new(0.155, 0.155))
            .unwrap();
        world
            .place(wall, &Pose::new(2.5, 0.0, 0.0), &Size::new(1.0, 4.0))
            .unwrap();

        let make = |name: &str, subscribers| {
            LaserSensor::new(
                &LaserSensorConfig {
                    name: name.into(),
                    ..Default::default()
                },
                FixedMount::default(),
                Subscriptions::new(subscribers),
            )
            .unwrap()
        };
        let mut front = make("front", 1).with_occupant(front_id);
        front
            .apply_config(&ConfigRequest {
                resolution: 100,
                min_angle: -100,
                max_angle: 100,
                reflectance: false,
            })
            .unwrap();
        let mut sensors = vec![front, make("idle", 0)];

        let mut sim = Simulation::new(0.1).unwrap();
        for _ in 0..3 {
            let results = sim.tick_occupants(&world, &world, &mut sensors);
            assert!(matches!(
                results[0],
                Ok(UpdateOutcome::Published { sample_count: 3 })
            ));
            assert!(matches!(results[1], Ok(UpdateOutcome::Unsubscribed)));
            let middle = sensors[0].latest().unwrap().samples()[1];
            assert!((middle.range - 2.0).abs() <= 0.05 + 1e-9, "{middle:?}");
        }
        assert_eq!(sim.ticks(), 3);
        assert!(sensors[1].latest().is_none());
    }
}
