#![doc = include_str!("../README.md")]

mod channel;
mod clients;
mod config;
mod error;
mod footprint;
mod pose;
mod scan;
mod scanner;
mod sensor;
mod simulation;
mod traits;
pub mod wire;

pub use channel::*;
pub use clients::*;
pub use config::*;
pub use error::*;
pub use footprint::*;
pub use pose::*;
pub use scan::*;
pub use scanner::*;
pub use sensor::*;
pub use simulation::*;
pub use traits::*;

// re-export
pub use nalgebra::{Isometry2, Point2, Vector2};
