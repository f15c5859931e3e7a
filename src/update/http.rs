use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::model::config::project_dirs;
use crate::update::install::apply_bundle;
use crate::update::{
    UpdateArtifact, UpdateClient, UpdateError, UpdateInfo, UpdateService, VersionString,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);
const USER_AGENT: &str = concat!("mk-processor-updater/", env!("CARGO_PKG_VERSION"));
const DEFAULT_ARTIFACT_NAME: &str = "update.zip";

/// Manifest document served at the update URL.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateManifest {
    pub version: String,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Per-platform downloads keyed by `"{os}-{arch}"`.
    #[serde(default)]
    pub assets: HashMap<String, String>,
}

/// Update transport over HTTPS, sharing one connection pool across clients.
#[derive(Debug, Clone)]
pub struct HttpUpdateService {
    http: reqwest::Client,
    download_dir: PathBuf,
}

impl HttpUpdateService {
    pub fn new() -> Result<Self, UpdateError> {
        let download_dir = project_dirs()
            .map(|dirs| dirs.cache_dir().join("updates"))
            .ok_or(UpdateError::NoCacheDir)?;
        Self::with_download_dir(download_dir)
    }

    pub fn with_download_dir(download_dir: PathBuf) -> Result<Self, UpdateError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(UpdateError::Client)?;

        Ok(Self { http, download_dir })
    }
}

impl UpdateService for HttpUpdateService {
    fn client(
        &self,
        current_version: &VersionString,
        manifest_url: &str,
    ) -> Result<Box<dyn UpdateClient>, UpdateError> {
        Ok(Box::new(HttpUpdateClient {
            http: self.http.clone(),
            current_version: current_version.clone(),
            manifest_url: manifest_url.to_string(),
            download_dir: self.download_dir.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct HttpUpdateClient {
    http: reqwest::Client,
    current_version: VersionString,
    manifest_url: String,
    download_dir: PathBuf,
}

impl HttpUpdateClient {
    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, UpdateError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(UpdateError::Runtime)?;
        Ok(rt.block_on(future))
    }

    async fn fetch_manifest(&self) -> Result<Option<UpdateManifest>, UpdateError> {
        let http_err = |source| UpdateError::Http {
            url: self.manifest_url.clone(),
            source,
        };

        let resp = self
            .http
            .get(&self.manifest_url)
            .send()
            .await
            .map_err(http_err)?;

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), url = %self.manifest_url, "update manifest request failed");
            return Ok(None);
        }

        let manifest = resp.json::<UpdateManifest>().await.map_err(http_err)?;
        Ok(Some(manifest))
    }

    async fn fetch_artifact(&self, update: &UpdateInfo) -> Result<Option<Vec<u8>>, UpdateError> {
        let http_err = |source| UpdateError::Http {
            url: update.download_ref.clone(),
            source,
        };

        let resp = self
            .http
            .get(&update.download_ref)
            .send()
            .await
            .map_err(http_err)?;

        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), url = %update.download_ref, "update download request failed");
            return Ok(None);
        }

        let bytes = resp.bytes().await.map_err(http_err)?;
        Ok(Some(bytes.to_vec()))
    }
}

impl UpdateClient for HttpUpdateClient {
    fn check(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        let Some(manifest) = self.block_on(self.fetch_manifest())?? else {
            return Ok(None);
        };
        resolve_update(&self.current_version, manifest, &platform_key())
    }

    fn download(&self, update: &UpdateInfo) -> Result<Option<UpdateArtifact>, UpdateError> {
        let Some(bytes) = self.block_on(self.fetch_artifact(update))?? else {
            return Ok(None);
        };
        if bytes.is_empty() {
            tracing::warn!(url = %update.download_ref, "update download was empty");
            return Ok(None);
        }

        let path = self
            .download_dir
            .join(update.version.as_str())
            .join(artifact_file_name(&update.download_ref));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| UpdateError::io("create", parent, err))?;
        }
        std::fs::write(&path, &bytes).map_err(|err| UpdateError::io("write", &path, err))?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "update downloaded");
        Ok(Some(UpdateArtifact {
            version: update.version.clone(),
            path,
        }))
    }

    fn install(&self, artifact: &UpdateArtifact) -> Result<(), UpdateError> {
        let target = std::env::current_exe()
            .map_err(|err| UpdateError::io("locate", "current executable", err))?;
        apply_bundle(&artifact.path, &target)
    }
}

/// Decide whether `manifest` offers something newer than `current` for this
/// platform.
pub fn resolve_update(
    current: &VersionString,
    manifest: UpdateManifest,
    platform: &str,
) -> Result<Option<UpdateInfo>, UpdateError> {
    let latest_version = VersionString::new(manifest.version);
    if latest_version.to_semver()? <= current.to_semver()? {
        return Ok(None);
    }

    let Some(download_ref) = manifest
        .assets
        .get(platform)
        .cloned()
        .or(manifest.download_url)
    else {
        tracing::warn!(%platform, version = %latest_version, "no update download for this platform");
        return Ok(None);
    };

    Ok(Some(UpdateInfo {
        version: latest_version,
        release_notes: manifest.release_notes,
        download_ref,
    }))
}

pub fn platform_key() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

fn artifact_file_name(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_ARTIFACT_NAME)
        .to_string()
}
