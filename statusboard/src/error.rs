use crate::config::ConfigError;
use crate::display::DisplayError;
use crate::input::InputError;

use std::io;

/// Startup and shutdown failures of the daemon.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Display(#[from] DisplayError),
    #[error("I/O error: {0}")]
    IO(#[from] io::Error),
}
