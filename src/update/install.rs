//! Applying a downloaded zip bundle over the installed executable.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::update::UpdateError;

const STAGING_DIR: &str = ".mk-processor-update-staging";

/// File name of the main binary inside an update bundle.
pub fn binary_name() -> String {
    format!("{}{}", env!("CARGO_PKG_NAME"), std::env::consts::EXE_SUFFIX)
}

/// Extract `bundle` next to `target_exe` and swap the new binary in. The
/// previous binary is kept as `<name>.old`.
pub fn apply_bundle(bundle: &Path, target_exe: &Path) -> Result<(), UpdateError> {
    if !bundle.exists() {
        return Err(UpdateError::io(
            "open",
            bundle,
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }

    let target_dir = target_exe.parent().ok_or_else(|| {
        UpdateError::io(
            "resolve directory of",
            target_exe,
            io::Error::from(io::ErrorKind::InvalidInput),
        )
    })?;

    let stage_dir = target_dir.join(STAGING_DIR);
    let _ = fs::remove_dir_all(&stage_dir);
    fs::create_dir_all(&stage_dir).map_err(|err| UpdateError::io("create", &stage_dir, err))?;

    extract_zip_to(bundle, &stage_dir)?;

    let main_name = binary_name();
    let new_main = stage_dir.join(&main_name);
    if !new_main.exists() {
        let _ = fs::remove_dir_all(&stage_dir);
        return Err(UpdateError::MissingBinary(main_name));
    }

    swap_file(target_exe, &new_main)?;

    let _ = fs::remove_dir_all(&stage_dir);
    let _ = fs::remove_file(bundle);

    tracing::info!(target = %target_exe.display(), "update bundle applied");
    Ok(())
}

/// Extract top-level files only; nested paths are skipped.
fn extract_zip_to(zip_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, UpdateError> {
    let archive_err = |source| UpdateError::Archive {
        path: zip_path.to_path_buf(),
        source,
    };

    let file = File::open(zip_path).map_err(|err| UpdateError::io("open", zip_path, err))?;
    let mut archive = ZipArchive::new(file).map_err(archive_err)?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(archive_err)?;
        if entry.is_dir() {
            continue;
        }

        let Some(name) = entry.enclosed_name() else {
            continue;
        };

        if name.components().count() != 1 {
            continue;
        }

        let out_path = out_dir.join(name);
        let mut out_file =
            File::create(&out_path).map_err(|err| UpdateError::io("create", &out_path, err))?;
        io::copy(&mut entry, &mut out_file)
            .map_err(|err| UpdateError::io("write", &out_path, err))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(0o755))
                .map_err(|err| UpdateError::io("set permissions on", &out_path, err))?;
        }

        extracted.push(out_path);
    }

    Ok(extracted)
}

fn swap_file(target: &Path, new_file: &Path) -> Result<(), UpdateError> {
    let target_file = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("app");

    let old_path = target.with_file_name(format!("{target_file}.old"));
    let _ = fs::remove_file(&old_path);

    if target.exists() {
        fs::rename(target, &old_path).map_err(|err| UpdateError::io("back up", target, err))?;
    }

    if let Err(err) = fs::rename(new_file, target) {
        if old_path.exists() {
            if let Err(restore_err) = fs::rename(&old_path, target) {
                tracing::error!(target = %target.display(), "failed to restore previous binary: {restore_err}");
            }
        }
        return Err(UpdateError::io("replace", target, err));
    }

    Ok(())
}
