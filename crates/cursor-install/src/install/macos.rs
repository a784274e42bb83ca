//! macOS installation from a disk image.
//!
//! The DMG is downloaded to a temporary directory, mounted read-only, and the
//! bundle is copied into the applications directory with `ditto`, which keeps
//! code signatures, extended attributes and resource forks intact. Any
//! existing bundle is overwritten without a backup; the disk image already
//! carries a complete, signed bundle.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::InstallerConfig;
use crate::download::Transport;
use crate::error::{InstallError, InstallWarning, Result};
use crate::install::desktop;
use crate::install::{InstallOutcome, InstallSummary};
use crate::resolve::DownloadTarget;

/// Installs the DMG build on macOS.
pub struct MacInstaller<'a> {
    config: &'a InstallerConfig,
    transport: &'a dyn Transport,
}

impl<'a> MacInstaller<'a> {
    /// Creates an installer using `transport` for the download.
    pub fn new(config: &'a InstallerConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    /// Downloads, mounts and copies the bundle, then links the CLI.
    pub fn install(&self, target: &DownloadTarget) -> Result<InstallSummary> {
        tracing::info!("Starting macOS installation");

        let work_dir = tempfile::Builder::new()
            .prefix("cursor-install-")
            .tempdir()
            .map_err(|e| {
                InstallError::InstallerFailed(format!("failed to create temp directory: {e}"))
            })?;

        let dmg_path = work_dir
            .path()
            .join(format!("{}.{}", self.config.app_name, target.kind.extension()));
        self.transport.fetch(&target.url, &dmg_path)?;

        let mount_point = work_dir.path().join("dmg_mount");
        fs::create_dir_all(&mount_point)?;
        attach(&dmg_path, &mount_point)?;

        // Always detach, even when the copy fails.
        let copied = self.copy_bundle(&mount_point);
        detach(&mount_point);
        let bundle = copied?;

        if let Err(e) = work_dir.close() {
            tracing::debug!("Failed to clean up temp directory: {}", e);
        }

        let mut summary = InstallSummary::new(InstallOutcome::Installed {
            path: bundle.clone(),
        });

        let cli = bundle.join(&self.config.macos.bundle_cli);
        if let Err(e) = desktop::link_cli(&cli, &self.config.macos.cli_link) {
            let warning = InstallWarning::DesktopIntegration(format!(
                "failed to link {}: {e}",
                self.config.macos.cli_link.display()
            ));
            tracing::warn!("{}", warning);
            summary.warnings.push(warning);
        }

        tracing::info!("Installed {}", bundle.display());
        Ok(summary)
    }

    /// Copies the mounted bundle over the installed one.
    fn copy_bundle(&self, mount_point: &Path) -> Result<PathBuf> {
        let mounted_app = find_bundle(mount_point, &self.config.macos.bundle_name)?;
        let dest_app = self.config.macos.bundle_path();

        if dest_app.exists() {
            tracing::info!("Removing existing bundle {}", dest_app.display());
            fs::remove_dir_all(&dest_app).map_err(|e| {
                InstallError::InstallerFailed(format!(
                    "failed to remove {}: {e}",
                    dest_app.display()
                ))
            })?;
        }

        tracing::info!("Copying {} to {}", mounted_app.display(), dest_app.display());
        let output = Command::new("ditto")
            .arg(&mounted_app)
            .arg(&dest_app)
            .output()
            .map_err(|e| InstallError::InstallerFailed(format!("failed to run ditto: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InstallError::InstallerFailed(format!(
                "ditto copy failed: {stderr}"
            )));
        }

        Ok(dest_app)
    }
}

/// Locates the application bundle inside a mounted image.
///
/// Prefers `bundle_name`, otherwise takes the first `.app` directory.
pub fn find_bundle(mount_point: &Path, bundle_name: &str) -> Result<PathBuf> {
    let expected = mount_point.join(bundle_name);
    if expected.is_dir() {
        return Ok(expected);
    }

    let entries: Vec<PathBuf> = fs::read_dir(mount_point)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .collect();

    entries
        .iter()
        .find(|path| path.is_dir() && path.extension().is_some_and(|ext| ext == "app"))
        .cloned()
        .ok_or_else(|| {
            let contents: Vec<String> = entries
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            InstallError::InstallerFailed(format!(
                "no application bundle in disk image, contents: {contents:?}"
            ))
        })
}

fn attach(dmg_path: &Path, mount_point: &Path) -> Result<()> {
    tracing::info!("Mounting {}", dmg_path.display());
    let output = Command::new("hdiutil")
        .args(["attach", "-nobrowse", "-readonly", "-mountpoint"])
        .arg(mount_point)
        .arg(dmg_path)
        .output()
        .map_err(|e| InstallError::InstallerFailed(format!("failed to run hdiutil: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(InstallError::InstallerFailed(format!(
            "failed to mount disk image: {stderr}"
        )))
    }
}

fn detach(mount_point: &Path) {
    tracing::debug!("Detaching {}", mount_point.display());
    match Command::new("hdiutil")
        .args(["detach", "-quiet"])
        .arg(mount_point)
        .output()
    {
        Ok(output) if output.status.success() => {}
        Ok(output) => tracing::warn!(
            "hdiutil detach failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ),
        Err(e) => tracing::warn!("Failed to run hdiutil detach: {}", e),
    }
}
