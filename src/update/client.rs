use crate::update::{UpdateArtifact, UpdateError, UpdateInfo, VersionString};

/// The three fallible steps of an update, bound to one running version and
/// manifest endpoint.
pub trait UpdateClient {
    /// `Ok(None)` when the manifest offers nothing newer.
    fn check(&self) -> Result<Option<UpdateInfo>, UpdateError>;

    /// `Ok(None)` when the artifact is not available.
    fn download(&self, update: &UpdateInfo) -> Result<Option<UpdateArtifact>, UpdateError>;

    fn install(&self, artifact: &UpdateArtifact) -> Result<(), UpdateError>;
}

/// Builds update clients. A client is created per use so each step sees the
/// version that configuration reports at that moment.
pub trait UpdateService {
    fn client(
        &self,
        current_version: &VersionString,
        manifest_url: &str,
    ) -> Result<Box<dyn UpdateClient>, UpdateError>;
}
