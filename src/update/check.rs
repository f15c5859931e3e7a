use crate::model::config::{ConfigAccessor, ConfigExt};
use crate::update::{UpdateError, UpdateInfo, UpdateService, VersionString};

/// Running version assumed when configuration does not name one.
pub const DEFAULT_VERSION: &str = "3.0.6";
/// Manifest endpoint assumed when configuration does not name one.
pub const DEFAULT_MANIFEST_URL: &str = "https://example.com/updates/mk_processor.json";

/// A positive check result, together with the running version it was
/// compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub info: UpdateInfo,
    pub checked_version: VersionString,
}

pub fn updates_enabled(config: &dyn ConfigAccessor) -> bool {
    config.get("app", "check_updates", true)
}

pub fn current_version(config: &dyn ConfigAccessor) -> VersionString {
    VersionString::new(config.get("app", "version", DEFAULT_VERSION.to_string()))
}

pub fn manifest_url(config: &dyn ConfigAccessor) -> String {
    config.get("app", "update_url", DEFAULT_MANIFEST_URL.to_string())
}

/// Startup check. Best effort: a disabled toggle skips the client entirely
/// and client failures are logged and reported as "no update".
pub fn check_for_updates(
    config: &dyn ConfigAccessor,
    service: &dyn UpdateService,
) -> Option<UpdateCheck> {
    if !updates_enabled(config) {
        tracing::debug!("update check disabled in config");
        return None;
    }

    match check_for_updates_now(config, service) {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!("update check failed: {err}");
            None
        }
    }
}

/// Check regardless of the toggle, surfacing client errors to the caller.
pub fn check_for_updates_now(
    config: &dyn ConfigAccessor,
    service: &dyn UpdateService,
) -> Result<Option<UpdateCheck>, UpdateError> {
    let checked_version = current_version(config);
    let url = manifest_url(config);

    let client = service.client(&checked_version, &url)?;
    let Some(info) = client.check()? else {
        tracing::info!(current = %checked_version, "no update available");
        return Ok(None);
    };

    tracing::info!(from = %checked_version, to = %info.version, "update available");
    Ok(Some(UpdateCheck {
        info,
        checked_version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryConfig, MockClient, QueuedService, install_error, update_info};

    #[test]
    fn disabled_toggle_never_touches_the_client() {
        let config = MemoryConfig::from_toml("[app]\ncheck_updates = false\n");
        let service = QueuedService::default();

        assert!(check_for_updates(&config, &service).is_none());
        assert_eq!(service.request_count(), 0);
    }

    #[test]
    fn fallback_literals_are_used_when_config_is_empty() {
        let config = MemoryConfig::default();
        let mut client = MockClient::new();
        client.expect_check().once().returning(|| Ok(None));
        let service = QueuedService::with([client]);

        assert!(check_for_updates(&config, &service).is_none());

        assert_eq!(
            service.requests.borrow().as_slice(),
            &[(
                "3.0.6".to_string(),
                "https://example.com/updates/mk_processor.json".to_string()
            )]
        );
        assert_eq!(DEFAULT_VERSION, "3.0.6");
        assert_eq!(
            DEFAULT_MANIFEST_URL,
            "https://example.com/updates/mk_processor.json"
        );
    }

    #[test]
    fn configured_values_override_fallbacks() {
        let config = MemoryConfig::from_toml(
            "[app]\nversion = \"3.1.0\"\nupdate_url = \"https://updates.internal/mk.json\"\n",
        );
        let mut client = MockClient::new();
        client
            .expect_check()
            .once()
            .returning(|| Ok(Some(update_info("3.2.0"))));
        let service = QueuedService::with([client]);

        let found = check_for_updates(&config, &service).unwrap();

        assert_eq!(found.info.version.as_str(), "3.2.0");
        assert_eq!(found.checked_version.as_str(), "3.1.0");
        assert_eq!(
            service.requests.borrow()[0],
            (
                "3.1.0".to_string(),
                "https://updates.internal/mk.json".to_string()
            )
        );
    }

    #[test]
    fn client_failure_reads_as_no_update() {
        let config = MemoryConfig::default();
        let mut client = MockClient::new();
        client.expect_check().once().returning(|| Err(install_error()));
        let service = QueuedService::with([client]);

        assert!(check_for_updates(&config, &service).is_none());
    }

    #[test]
    fn manual_check_ignores_toggle_and_surfaces_errors() {
        let config = MemoryConfig::from_toml("[app]\ncheck_updates = false\n");
        let mut client = MockClient::new();
        client.expect_check().once().returning(|| Err(install_error()));
        let service = QueuedService::with([client]);

        let result = check_for_updates_now(&config, &service);

        assert!(result.is_err());
        assert_eq!(service.request_count(), 1);
    }
}
