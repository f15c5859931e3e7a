pub mod manager;
pub mod manifest;
pub mod runtime;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use manager::PluginManager;

/// Manager-level failure. Problems with a single plugin are recorded in the
/// registry instead.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to read plugin directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Populates a plugin registry.
pub trait PluginLoader {
    fn load_plugins(&mut self) -> Result<(), PluginError>;
}
