//! Startup sequencing.
//!
//! [`Bootstrap::run`] brings the application up in a fixed order:
//!
//! 1. install failure reporting
//! 2. ensure the working storage directory (non-fatal)
//! 3. load plugins (manager-level failures propagate)
//! 4. build and show the shell
//! 5. check for updates, after the shell is visible
//! 6. schedule the update offer one second later
//!
//! The event loop is not started here; the returned [`Launch`] carries the
//! shell and its deferred tasks to whoever drives the loop.

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;

use crate::deferred::DeferredQueue;
use crate::model::config::{ConfigAccessor, ConfigExt, expand_tilde};
use crate::plugin::{PluginError, PluginLoader};
use crate::report::{Notice, Reporter};
use crate::shell::Shell;
use crate::update::{UpdatePrompt, UpdateService, check_for_updates};

pub const DEFAULT_WEB_FOLDER: &str = "~/GoogleDriveMount/Web/";

/// Delay between the update check and the offer, so the shell finishes its
/// first render.
pub const UPDATE_PROMPT_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to load plugins: {0}")]
    Plugins(#[from] PluginError),
    #[error("failed to show the application shell: {0:#}")]
    Shell(#[source] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    Present(PathBuf),
    Created(PathBuf),
    Unavailable { path: PathBuf, error: String },
}

impl StorageStatus {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Present(path) | Self::Created(path) | Self::Unavailable { path, .. } => path,
        }
    }

    pub fn warning(&self) -> Option<Notice> {
        let Self::Unavailable { path, error } = self else {
            return None;
        };

        Some(Notice::warning(
            "Directory Warning",
            format!(
                "Could not create web folder at {}.\n\nError: {error}\n\nThe application will continue, but functionality may be limited.",
                path.display()
            ),
        ))
    }
}

/// Resolve the configured storage directory and create it when missing.
pub fn ensure_storage_dir(config: &dyn ConfigAccessor) -> StorageStatus {
    let raw: String = config.get("google_drive", "web_folder", DEFAULT_WEB_FOLDER.to_string());
    let path = expand_tilde(&raw);

    if path.is_dir() {
        return StorageStatus::Present(path);
    }

    match fs::create_dir_all(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "created storage directory");
            StorageStatus::Created(path)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), "could not create storage directory: {err}");
            StorageStatus::Unavailable {
                path,
                error: err.to_string(),
            }
        }
    }
}

/// A bootstrapped shell, ready for its event loop.
pub struct Launch<S> {
    pub shell: S,
    pub deferred: DeferredQueue<S>,
    pub storage: StorageStatus,
}

pub struct Bootstrap<'a> {
    config: Rc<dyn ConfigAccessor>,
    reporter: &'a dyn Reporter,
    updates: Rc<dyn UpdateService>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        config: Rc<dyn ConfigAccessor>,
        reporter: &'a dyn Reporter,
        updates: Rc<dyn UpdateService>,
    ) -> Self {
        Self {
            config,
            reporter,
            updates,
        }
    }

    pub fn run<P, S, F>(self, mut plugins: P, build_shell: F) -> Result<Launch<S>, BootstrapError>
    where
        P: PluginLoader,
        S: Shell + 'static,
        F: FnOnce(P) -> S,
    {
        self.reporter.install();

        let storage = ensure_storage_dir(&*self.config);
        let storage_warning = storage.warning();
        if let Some(notice) = &storage_warning {
            self.reporter.warning(notice);
        }

        plugins.load_plugins()?;

        let mut shell = build_shell(plugins);
        shell.show().map_err(BootstrapError::Shell)?;
        if let Some(notice) = storage_warning {
            shell.notify(notice);
        }

        let mut deferred = DeferredQueue::new();
        if let Some(check) = check_for_updates(&*self.config, &*self.updates) {
            let config = Rc::clone(&self.config);
            let updates = Rc::clone(&self.updates);
            deferred.single_shot(UPDATE_PROMPT_DELAY, move |shell: &mut S| {
                shell.offer_update(UpdatePrompt::offer(check, config, updates));
            });
        }

        tracing::info!(storage = %storage.path().display(), "bootstrap complete");
        Ok(Launch {
            shell,
            deferred,
            storage,
        })
    }
}
