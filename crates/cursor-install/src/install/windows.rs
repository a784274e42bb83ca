//! Windows installation through the MSI package driver.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::config::InstallerConfig;
use crate::download::Transport;
use crate::error::{InstallError, Result};
use crate::install::{InstallOutcome, InstallSummary};
use crate::resolve::DownloadTarget;

/// `msiexec` exit code for success with a pending reboot.
const ERROR_SUCCESS_REBOOT_REQUIRED: i32 = 3010;

/// Installs the MSI build on Windows.
pub struct WindowsInstaller<'a> {
    config: &'a InstallerConfig,
    transport: &'a dyn Transport,
}

impl<'a> WindowsInstaller<'a> {
    /// Creates an installer using `transport` for the download.
    pub fn new(config: &'a InstallerConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    /// Downloads the package and runs it unattended.
    ///
    /// When `msiexec` is not available the package is kept and the operator is
    /// asked to run it.
    pub fn install(&self, target: &DownloadTarget) -> Result<InstallSummary> {
        tracing::info!("Starting Windows installation");

        let work_dir = tempfile::Builder::new()
            .prefix("cursor-install-")
            .tempdir()
            .map_err(|e| {
                InstallError::InstallerFailed(format!("failed to create temp directory: {e}"))
            })?;
        let msi_path = work_dir
            .path()
            .join(format!("{}Setup.{}", self.config.app_name, target.kind.extension()));
        self.transport.fetch(&target.url, &msi_path)?;

        match run_msiexec(&msi_path) {
            Ok(status) if msi_succeeded(status) => {
                tracing::info!("msiexec finished ({})", status);
                Ok(self.package_installed())
            }
            Ok(status) => Err(InstallError::InstallerFailed(format!(
                "msiexec exited with {status}"
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let installer = keep_package(work_dir, &msi_path);
                tracing::warn!(
                    "msiexec is not available. Run {} manually to finish the installation",
                    installer.display()
                );
                Ok(InstallSummary::new(InstallOutcome::ManualActionRequired {
                    installer,
                }))
            }
            Err(e) => Err(InstallError::InstallerFailed(format!(
                "failed to run msiexec: {e}"
            ))),
        }
    }

    /// Outcome of a completed `msiexec` run. The package itself is not kept.
    fn package_installed(&self) -> InstallSummary {
        InstallSummary::new(InstallOutcome::PackageInstalled {
            product: self.config.app_name.clone(),
        })
    }
}

fn run_msiexec(msi_path: &Path) -> io::Result<ExitStatus> {
    tracing::info!("Running msiexec for {}", msi_path.display());
    Command::new("msiexec")
        .arg("/i")
        .arg(msi_path)
        .args(["/qn", "/norestart"])
        .status()
}

fn msi_succeeded(status: ExitStatus) -> bool {
    status.success() || status.code() == Some(ERROR_SUCCESS_REBOOT_REQUIRED)
}

/// Keeps the temporary directory alive so the operator can run the package.
fn keep_package(work_dir: tempfile::TempDir, msi_path: &Path) -> PathBuf {
    let file_name = msi_path.file_name().map(PathBuf::from).unwrap_or_default();
    work_dir.keep().join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoNetwork;

    impl Transport for NoNetwork {
        fn get_text(&self, url: &str) -> Result<String> {
            Err(InstallError::Network(format!("no route to {url}")))
        }

        fn fetch(&self, url: &str, _dest: &Path) -> Result<u64> {
            Err(InstallError::Network(format!("no route to {url}")))
        }

        fn probe(&self, _url: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_package_installed_reports_product() {
        let config = InstallerConfig::default();
        let summary = WindowsInstaller::new(&config, &NoNetwork).package_installed();
        assert_eq!(
            summary.outcome,
            InstallOutcome::PackageInstalled {
                product: "Cursor".to_string()
            }
        );
        assert_eq!(
            summary.outcome.to_string(),
            "Cursor installed by the system package installer"
        );
    }

    #[test]
    fn test_keep_package_survives_drop() {
        let work_dir = tempfile::tempdir().unwrap();
        let msi = work_dir.path().join("CursorSetup.msi");
        std::fs::write(&msi, b"msi").unwrap();

        let kept = keep_package(work_dir, &msi);
        assert_eq!(kept, msi);
        assert!(kept.exists());
        std::fs::remove_dir_all(kept.parent().unwrap()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_mapping() {
        use std::os::unix::process::ExitStatusExt;

        assert!(msi_succeeded(ExitStatus::from_raw(0)));
        assert!(!msi_succeeded(ExitStatus::from_raw(1 << 8)));
    }

    #[cfg(windows)]
    #[test]
    fn test_reboot_required_counts_as_success() {
        use std::os::windows::process::ExitStatusExt;

        assert!(msi_succeeded(ExitStatus::from_raw(3010)));
        assert!(!msi_succeeded(ExitStatus::from_raw(1603)));
    }
}
