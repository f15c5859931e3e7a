use std::fs;
use std::path::{Path, PathBuf};

use crate::plugin::manifest::{PluginId, PluginManifest};

pub const MANIFEST_FILE: &str = "plugin.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginStatus {
    Loaded,
    Error(String),
}

/// Handle for one plugin directory.
#[derive(Debug, Clone)]
pub struct PluginRuntime {
    pub id: PluginId,
    pub root_dir: PathBuf,
    pub manifest: Option<PluginManifest>,
    pub status: PluginStatus,
}

impl PluginRuntime {
    /// Read the manifest and verify the entry file exists. Problems are kept
    /// as [`PluginStatus::Error`] instead of failing the whole load.
    pub fn load(id: PluginId, root_dir: PathBuf) -> Self {
        let manifest = match Self::read_manifest(&root_dir) {
            Ok(manifest) => manifest,
            Err(err) => {
                return Self {
                    id,
                    root_dir,
                    manifest: None,
                    status: PluginStatus::Error(err),
                };
            }
        };

        let entry_path = root_dir.join(&manifest.entry);
        let status = if entry_path.is_file() {
            PluginStatus::Loaded
        } else {
            PluginStatus::Error(format!("missing entry: {}", entry_path.display()))
        };

        Self {
            id,
            root_dir,
            manifest: Some(manifest),
            status,
        }
    }

    pub fn status(&self) -> &PluginStatus {
        &self.status
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.status, PluginStatus::Loaded)
    }

    pub fn display_name(&self) -> String {
        self.manifest
            .as_ref()
            .map(|manifest| manifest.name.clone())
            .unwrap_or_else(|| self.id.0.clone())
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest
            .as_ref()
            .map(|manifest| manifest.version.as_str())
    }

    fn read_manifest(root_dir: &Path) -> Result<PluginManifest, String> {
        let manifest_path = root_dir.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&manifest_path)
            .map_err(|err| format!("{}: {err}", manifest_path.display()))?;

        toml::from_str::<PluginManifest>(&raw)
            .map_err(|err| format!("{}: {err}", manifest_path.display()))
    }
}
