use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::model::config::{ConfigAccessor, ConfigExt, expand_tilde, project_dirs};
use crate::plugin::manifest::PluginId;
use crate::plugin::runtime::{PluginRuntime, PluginStatus};
use crate::plugin::{PluginError, PluginLoader};

/// Loaded plugins keyed by id. Ordered so listings are stable.
pub type PluginRegistry = BTreeMap<PluginId, PluginRuntime>;

#[derive(Debug, Default)]
pub struct PluginManager {
    root_dir: PathBuf,
    disabled: HashSet<String>,
    runtimes: PluginRegistry,
}

impl PluginManager {
    pub fn new(root_dir: PathBuf, disabled: impl IntoIterator<Item = String>) -> Self {
        Self {
            root_dir,
            disabled: disabled.into_iter().collect(),
            runtimes: PluginRegistry::new(),
        }
    }

    pub fn from_config<C: ConfigAccessor + ?Sized>(config: &C) -> Self {
        let dir: String = config.get("plugins", "dir", String::new());
        let root_dir = if dir.trim().is_empty() {
            default_plugin_base_dir()
        } else {
            expand_tilde(dir.trim())
        };
        let disabled: Vec<String> = config.get("plugins", "disabled", Vec::new());

        Self::new(root_dir, disabled)
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.runtimes
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.runtimes
            .get(&PluginId::new(id))
            .is_some_and(PluginRuntime::is_loaded)
    }

    pub fn plugin_count(&self) -> usize {
        self.runtimes.len()
    }

    pub fn error_count(&self) -> usize {
        self.runtimes
            .values()
            .filter(|runtime| matches!(runtime.status(), PluginStatus::Error(_)))
            .count()
    }

    pub fn startup_notifications(&self) -> Vec<String> {
        if self.runtimes.is_empty() {
            return Vec::new();
        }

        let mut notices = vec![self.summary_notification()];
        notices.extend(self.error_notifications());
        notices
    }

    pub fn summary_notification(&self) -> String {
        let loaded = self
            .runtimes
            .keys()
            .filter(|id| self.is_loaded(id.as_str()))
            .count();
        format!("plugins: {loaded} loaded, {} errors", self.error_count())
    }

    pub fn error_notifications(&self) -> Vec<String> {
        self.runtimes
            .values()
            .filter_map(|runtime| {
                if let PluginStatus::Error(err) = runtime.status() {
                    Some(format!(
                        "plugin {} ({}): {err}",
                        runtime.display_name(),
                        runtime.root_dir.display()
                    ))
                } else {
                    None
                }
            })
            .collect()
    }

    /// One display row per plugin, in registry order.
    pub fn list_rows(&self) -> Vec<String> {
        if self.runtimes.is_empty() {
            return vec![format!("no plugins in {}", self.root_dir.display())];
        }

        self.runtimes
            .values()
            .map(|runtime| {
                let status = match runtime.status() {
                    PluginStatus::Loaded => "loaded".to_string(),
                    PluginStatus::Error(err) => format!("error: {err}"),
                };
                let version = runtime.version().unwrap_or("?");

                let mut row = format!("{} {version} [{status}]", runtime.display_name());
                if let Some(manifest) = &runtime.manifest {
                    if let Some(description) = &manifest.description {
                        row.push_str(&format!(" {description}"));
                    }
                    if let Some(author) = &manifest.author {
                        row.push_str(&format!(" ({author})"));
                    }
                }
                row
            })
            .collect()
    }
}

impl PluginLoader for PluginManager {
    fn load_plugins(&mut self) -> Result<(), PluginError> {
        self.runtimes.clear();

        let entries = match fs::read_dir(&self.root_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(dir = %self.root_dir.display(), "plugin directory absent; no plugins loaded");
                return Ok(());
            }
            Err(source) => {
                return Err(PluginError::ReadDir {
                    path: self.root_dir.clone(),
                    source,
                });
            }
        };

        for entry in entries {
            let entry = entry.map_err(|source| PluginError::ReadDir {
                path: self.root_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(dir_name) = path.file_name().map(|name| name.to_string_lossy().into_owned())
            else {
                continue;
            };

            if self.disabled.contains(&dir_name) {
                tracing::debug!(plugin = %dir_name, "plugin disabled in config");
                continue;
            }

            let id = PluginId::new(dir_name);
            let runtime = PluginRuntime::load(id.clone(), path);
            match runtime.status() {
                PluginStatus::Loaded => tracing::info!(plugin = %id.as_str(), "plugin loaded"),
                PluginStatus::Error(err) => {
                    tracing::warn!(plugin = %id.as_str(), "plugin failed to load: {err}")
                }
            }
            self.runtimes.insert(id, runtime);
        }

        tracing::info!("{}", self.summary_notification());
        Ok(())
    }
}

fn default_plugin_base_dir() -> PathBuf {
    if let Some(project_dirs) = project_dirs() {
        return project_dirs.config_dir().join("plugins");
    }

    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".config/mk-processor/plugins");
    }

    PathBuf::from(".mk-processor-plugins")
}
