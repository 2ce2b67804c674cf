use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use fs_err as fs;
use lasersim::{
    wire::ConfigRequest, FixedMount, GridWorld, GridWorldConfig, LaserSensor, LaserSensorConfig,
    OccupancyQuery, Pose, Reflectivity, Simulation, Size, Subscriptions, UpdateOutcome,
};
use lasersim_tracing::Tracing;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Error;

pub type SimSensor = LaserSensor<FixedMount, Subscriptions>;

/// A rectangular obstacle in the grid world.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ObstacleConfig {
    #[serde(default)]
    pub reflectivity: Reflectivity,
    pub pose: Pose,
    pub size: Size,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SensorEntryConfig {
    /// Number of clients reading the scan. Zero keeps the sensor idle.
    #[serde(default = "default_subscribers")]
    pub subscribers: usize,
    /// Configuration requests sent to the sensor before the first tick.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<ConfigRequest>,
    pub laser: LaserSensorConfig,
    /// Global pose of the body the laser is mounted on.
    #[serde(default)]
    pub mount: Pose,
}

fn default_subscribers() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Duration of one tick (seconds).
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Emit a trace event for every world query.
    #[serde(default)]
    pub trace_world: bool,
    #[serde(default)]
    pub world: GridWorldConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensors: Vec<SensorEntryConfig>,
}

fn default_dt() -> f64 {
    0.1
}

fn default_ticks() -> u64 {
    10
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            ticks: default_ticks(),
            trace_world: false,
            world: GridWorldConfig::default(),
            obstacles: Vec::new(),
            sensors: vec![SensorEntryConfig {
                subscribers: default_subscribers(),
                requests: Vec::new(),
                laser: LaserSensorConfig::default(),
                mount: Pose::new(5.0, 5.0, 0.0),
            }],
        }
    }
}

/// What happened to every sensor during one tick.
#[derive(Debug)]
pub struct TickReport<'a> {
    pub tick: u64,
    pub time: f64,
    pub sensors: &'a [SimSensor],
    pub results: Vec<lasersim::Result<UpdateOutcome>>,
}

impl SimConfig {
    pub fn try_new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_str(
            &fs::read_to_string(&path)
                .map_err(|e| Error::NoFile(path.as_ref().to_owned(), e))?,
            path,
        )
    }

    pub fn from_str<P: AsRef<Path>>(s: &str, path: P) -> Result<Self, Error> {
        let config: SimConfig =
            toml::from_str(s).map_err(|e| Error::TomlParseFailure(path.as_ref().to_owned(), e))?;
        config.validate(path.as_ref())?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), Error> {
        let invalid = |message: String| Error::InvalidConfig(PathBuf::from(path), message);
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(invalid(format!("dt must be positive, got {}", self.dt)));
        }
        let mut names = HashSet::new();
        for entry in &self.sensors {
            if !names.insert(entry.laser.name.as_str()) {
                return Err(Error::DuplicateSensorName(entry.laser.name.clone()));
            }
            if !(entry.laser.update_rate > 0.0 && entry.laser.update_rate.is_finite()) {
                return Err(invalid(format!(
                    "sensors.{}: update_rate must be positive",
                    entry.laser.name
                )));
            }
        }
        Ok(())
    }

    pub fn build_world(&self) -> Result<GridWorld, Error> {
        let mut world = GridWorld::new(&self.world)?;
        for obstacle in &self.obstacles {
            world.add_obstacle(&obstacle.pose, &obstacle.size, obstacle.reflectivity);
        }
        debug!(obstacles = self.obstacles.len(), "built grid world");
        Ok(world)
    }

    /// Creates the sensors, with their configuration requests queued.
    pub fn build_sensors(&self) -> Result<Vec<SimSensor>, Error> {
        self.sensors
            .iter()
            .map(|entry| -> Result<SimSensor, Error> {
                let mut sensor = LaserSensor::new(
                    &entry.laser,
                    FixedMount(entry.mount),
                    Subscriptions::new(entry.subscribers),
                )?;
                for request in &entry.requests {
                    sensor.submit_config(request.encode());
                }
                Ok(sensor)
            })
            .collect()
    }

    /// Runs the configured number of ticks, handing every tick to `on_tick`.
    /// Returns the sensors in their final state.
    pub fn run<F>(&self, on_tick: F) -> Result<Vec<SimSensor>, Error>
    where
        F: FnMut(TickReport<'_>),
    {
        let world = self.build_world()?;
        if self.trace_world {
            self.run_in(Tracing::new(world), on_tick)
        } else {
            self.run_in(world, on_tick)
        }
    }

    fn run_in<W, F>(&self, mut world: W, mut on_tick: F) -> Result<Vec<SimSensor>, Error>
    where
        W: OccupancyQuery,
        F: FnMut(TickReport<'_>),
    {
        let mut sensors = self.build_sensors()?;
        let mut sim = Simulation::new(self.dt)?;
        info!(
            sensors = sensors.len(),
            ticks = self.ticks,
            dt = self.dt,
            "starting simulation"
        );
        for _ in 0..self.ticks {
            let results = sim.tick(&mut world, &mut sensors);
            on_tick(TickReport {
                tick: sim.ticks(),
                time: sim.time(),
                sensors: &sensors,
                results,
            });
        }
        for sensor in &mut sensors {
            sensor.shutdown(&mut world);
        }
        Ok(sensors)
    }
}
