use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("lasersim-apps: Failed to parse {:?} as toml ({}).", .0, .1)]
    TomlParseFailure(PathBuf, #[source] toml::de::Error),
    #[error("lasersim-apps: No File {:?} is found ({}).", .0, .1)]
    NoFile(PathBuf, #[source] std::io::Error),
    #[error("lasersim-apps: Invalid config {:?}: {}", .0, .1)]
    InvalidConfig(PathBuf, String),
    #[error("lasersim-apps: Sensor name {:?} is used more than once.", .0)]
    DuplicateSensorName(String),
    #[error("lasersim-apps: lasersim: {:?}", .0)]
    Lasersim(#[from] lasersim::Error),
}
