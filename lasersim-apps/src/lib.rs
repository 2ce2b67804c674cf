#![doc = include_str!("../README.md")]

mod error;
mod sim_config;
pub mod utils;

pub use error::*;
pub use sim_config::*;
