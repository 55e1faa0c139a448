pub mod mspms_commands;
pub mod profile;
#[macro_use]
extern crate log;

use definitions::ConfigError;
use mscompat::RunError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Arguments that clap accepts but that do not describe a run. Exits with 2, as clap does.
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("malformed profile: {0}")]
    Profile(#[from] toml::de::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Run(#[from] RunError),
}
