//! The user-driven part of an update.
//!
//! ```text
//! Offered ─┬─ decline ─> Declined
//!          └─ accept ──> Downloading ─┬─> DownloadFailed
//!                                     └─> Installing ─┬─> InstallFailed
//!                                                     └─> Installed
//! ```
//!
//! An [`UpdatePrompt`] is the `Offered` state. `accept` and `decline` take it
//! by value, so each offer resolves exactly once.

use std::fmt;
use std::rc::Rc;

use crate::model::config::ConfigAccessor;
use crate::report::Notice;
use crate::update::check::{current_version, manifest_url};
use crate::update::{UpdateCheck, UpdateService, VersionString};

pub const DEFAULT_RELEASE_NOTES: &str = "No release notes available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Offered,
    Declined,
    Downloading,
    DownloadFailed,
    Installing,
    InstallFailed,
    Installed,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Offered => "offered",
            Self::Declined => "declined",
            Self::Downloading => "downloading",
            Self::DownloadFailed => "download failed",
            Self::Installing => "installing",
            Self::InstallFailed => "install failed",
            Self::Installed => "installed",
        };
        f.write_str(label)
    }
}

/// How an offer resolved, plus anything the user should be told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub state: UpdateState,
    pub version: VersionString,
    pub notice: Option<Notice>,
}

pub struct UpdatePrompt {
    check: UpdateCheck,
    running_version: VersionString,
    config: Rc<dyn ConfigAccessor>,
    service: Rc<dyn UpdateService>,
}

impl fmt::Debug for UpdatePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePrompt")
            .field("check", &self.check)
            .field("running_version", &self.running_version)
            .finish_non_exhaustive()
    }
}

impl UpdatePrompt {
    /// Build the offer. The running version shown to the user is read from
    /// configuration now, not taken from the check.
    pub fn offer(
        check: UpdateCheck,
        config: Rc<dyn ConfigAccessor>,
        service: Rc<dyn UpdateService>,
    ) -> Self {
        let running_version = current_version(&*config);
        tracing::info!(version = %check.info.version, running = %running_version, "update offered");

        Self {
            check,
            running_version,
            config,
            service,
        }
    }

    pub fn version(&self) -> &VersionString {
        &self.check.info.version
    }

    pub fn running_version(&self) -> &VersionString {
        &self.running_version
    }

    pub fn release_notes(&self) -> &str {
        self.check
            .info
            .release_notes
            .as_deref()
            .filter(|notes| !notes.trim().is_empty())
            .unwrap_or(DEFAULT_RELEASE_NOTES)
    }

    pub fn decline(self) -> UpdateOutcome {
        tracing::info!(version = %self.version(), "update declined");
        UpdateOutcome {
            state: UpdateState::Declined,
            version: self.check.info.version,
            notice: None,
        }
    }

    /// Download and install. Runs to a terminal state; failures are logged and
    /// folded into the outcome, never raised.
    pub fn accept(self) -> UpdateOutcome {
        let version = self.check.info.version.clone();

        // Configuration may have changed since the check ran.
        let current = current_version(&*self.config);
        if current != self.check.checked_version {
            tracing::warn!(
                checked = %self.check.checked_version,
                now = %current,
                "running version changed between update check and acceptance"
            );
        }

        tracing::info!(%version, state = %UpdateState::Downloading, "update accepted");
        let client = match self.service.client(&current, &manifest_url(&*self.config)) {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!("update client unavailable: {err}");
                return finish(UpdateState::DownloadFailed, version, None);
            }
        };

        let artifact = match client.download(&self.check.info) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                tracing::warn!(%version, "update download produced no artifact");
                return finish(UpdateState::DownloadFailed, version, None);
            }
            Err(err) => {
                tracing::warn!(%version, "update download failed: {err}");
                return finish(UpdateState::DownloadFailed, version, None);
            }
        };

        tracing::info!(%version, path = %artifact.path.display(), state = %UpdateState::Installing, "update downloaded");
        match client.install(&artifact) {
            Ok(()) => {
                let notice = Notice::info(
                    "Update Installed",
                    format!(
                        "MK Processor {version} has been installed. Restart the application to use it."
                    ),
                );
                finish(UpdateState::Installed, version, Some(notice))
            }
            Err(err) => {
                tracing::warn!(%version, "update install failed: {err}");
                let notice = Notice::warning(
                    "Update Failed",
                    "Failed to install the update. Please try again later.",
                );
                finish(UpdateState::InstallFailed, version, Some(notice))
            }
        }
    }
}

fn finish(state: UpdateState, version: VersionString, notice: Option<Notice>) -> UpdateOutcome {
    tracing::info!(%version, %state, "update flow finished");
    UpdateOutcome {
        state,
        version,
        notice,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::report::Severity;
    use crate::test_support::{
        MemoryConfig, MockClient, QueuedService, artifact, install_error, update_info,
    };
    use crate::update::UpdateInfo;

    fn offered(
        config: &Rc<MemoryConfig>,
        service: &Rc<QueuedService>,
        info: UpdateInfo,
    ) -> UpdatePrompt {
        let check = UpdateCheck {
            info,
            checked_version: VersionString::new("3.0.6"),
        };
        UpdatePrompt::offer(check, config.clone(), service.clone())
    }

    #[test]
    fn decline_has_no_side_effects() {
        let config = Rc::new(MemoryConfig::default());
        let service = Rc::new(QueuedService::default());
        let prompt = offered(&config, &service, update_info("3.1.0"));

        let outcome = prompt.decline();

        assert_eq!(outcome.state, UpdateState::Declined);
        assert!(outcome.notice.is_none());
        assert_eq!(service.request_count(), 0);
    }

    #[test]
    fn empty_download_never_installs() {
        let config = Rc::new(MemoryConfig::default());
        let mut client = MockClient::new();
        client.expect_download().once().returning(|_| Ok(None));
        client.expect_install().never();
        let service = Rc::new(QueuedService::with([client]));

        let outcome = offered(&config, &service, update_info("3.1.0")).accept();

        assert_eq!(outcome.state, UpdateState::DownloadFailed);
        assert!(outcome.notice.is_none());
    }

    #[test]
    fn download_error_is_a_failed_outcome() {
        let config = Rc::new(MemoryConfig::default());
        let mut client = MockClient::new();
        client
            .expect_download()
            .once()
            .returning(|_| Err(install_error()));
        client.expect_install().never();
        let service = Rc::new(QueuedService::with([client]));

        let outcome = offered(&config, &service, update_info("3.1.0")).accept();

        assert_eq!(outcome.state, UpdateState::DownloadFailed);
    }

    #[test]
    fn failed_install_warns_once_without_retry() {
        let config = Rc::new(MemoryConfig::default());
        let mut client = MockClient::new();
        client
            .expect_download()
            .once()
            .returning(|_| Ok(Some(artifact("3.1.0"))));
        client
            .expect_install()
            .once()
            .returning(|_| Err(install_error()));
        let service = Rc::new(QueuedService::with([client]));

        let outcome = offered(&config, &service, update_info("3.1.0")).accept();

        assert_eq!(outcome.state, UpdateState::InstallFailed);
        let notice = outcome.notice.unwrap();
        assert_eq!(notice.severity, Severity::Warning);
        assert_eq!(notice.title, "Update Failed");
        assert_eq!(
            notice.message,
            "Failed to install the update. Please try again later."
        );
    }

    #[test]
    fn successful_install_reaches_installed() {
        let config = Rc::new(MemoryConfig::default());
        let mut client = MockClient::new();
        client
            .expect_download()
            .withf(|info| info.version.as_str() == "3.1.0")
            .once()
            .returning(|_| Ok(Some(artifact("3.1.0"))));
        client
            .expect_install()
            .withf(|artifact| artifact.version.as_str() == "3.1.0")
            .once()
            .returning(|_| Ok(()));
        let service = Rc::new(QueuedService::with([client]));

        let outcome = offered(&config, &service, update_info("3.1.0")).accept();

        assert_eq!(outcome.state, UpdateState::Installed);
        assert_eq!(outcome.notice.unwrap().severity, Severity::Info);
    }

    #[test]
    fn versions_are_re_read_at_prompt_and_accept_time() {
        let config = Rc::new(MemoryConfig::from_toml("[app]\nversion = \"3.0.6\"\n"));
        let mut client = MockClient::new();
        client.expect_download().once().returning(|_| Ok(None));
        let service = Rc::new(QueuedService::with([client]));

        config.set("app", "version", "3.0.7");
        let prompt = offered(&config, &service, update_info("3.1.0"));
        assert_eq!(prompt.running_version().as_str(), "3.0.7");

        config.set("app", "version", "3.0.8");
        prompt.accept();

        assert_eq!(service.requests.borrow()[0].0, "3.0.8");
    }

    #[test]
    fn missing_notes_fall_back_to_default_text() {
        let config = Rc::new(MemoryConfig::default());
        let service = Rc::new(QueuedService::default());
        let mut info = update_info("3.1.0");
        info.release_notes = None;

        let prompt = offered(&config, &service, info);

        assert_eq!(prompt.release_notes(), "No release notes available.");
    }
}
