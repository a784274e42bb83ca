//! Error types for the installer.

use std::fmt;

use thiserror::Error;

/// Errors that abort an installation run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// The host kernel or CPU architecture is not supported.
    #[error("unsupported platform: kernel '{kernel}', machine '{machine}'")]
    UnsupportedPlatform {
        /// Kernel name as reported by the host.
        kernel: String,
        /// Machine architecture as reported by the host.
        machine: String,
    },

    /// Fetching the artifact failed.
    #[error("download of {url} failed: {reason}")]
    DownloadFailed {
        /// URL that was being fetched.
        url: String,
        /// Transport or status failure.
        reason: String,
    },

    /// Fetching failed and restoring the backup failed as well.
    #[error("download failed ({reason}) and restoring the backup failed: {restore}")]
    RollbackFailed {
        /// Why the download failed.
        reason: String,
        /// Why the restore failed.
        restore: String,
    },

    /// Running instances did not exit, replacement was refused.
    #[error("{} process(es) still running after termination: {}", remaining.len(), format_pids(remaining))]
    ProcessTerminationTimeout {
        /// PIDs that survived termination.
        remaining: Vec<u32>,
    },

    /// Backing up or removing the live artifact failed.
    #[error("backup error: {0}")]
    Backup(String),

    /// The platform installer step failed (mount, copy, msiexec).
    #[error("installer error: {0}")]
    InstallerFailed(String),

    /// Network request failed.
    #[error("network error: {0}")]
    Network(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(String),
}

fn format_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl InstallError {
    /// Returns a short message suitable for showing to the operator.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::UnsupportedPlatform { .. } => {
                "This operating system or CPU architecture is not supported."
            }
            Self::DownloadFailed { .. } | Self::Network(_) => {
                "Could not download Cursor. Please check your internet connection."
            }
            Self::RollbackFailed { .. } => {
                "The download failed and the previous version could not be restored. \
                 A backup is kept next to the install location."
            }
            Self::ProcessTerminationTimeout { .. } => {
                "Cursor is still running. Close it and run the installer again."
            }
            Self::Backup(_) => "Could not back up the existing installation.",
            Self::InstallerFailed(_) => "The platform installer step failed.",
            Self::Io(_) => "An unexpected file system error occurred.",
        }
    }
}

impl From<reqwest::Error> for InstallError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<std::io::Error> for InstallError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for installer operations.
pub type Result<T> = std::result::Result<T, InstallError>;

/// Non-fatal problems encountered after the artifact was installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallWarning {
    /// The FUSE runtime could not be verified or installed.
    DependencyInstall(String),
    /// Icon, desktop entry or CLI link could not be written.
    DesktopIntegration(String),
    /// The pre-download reachability probe failed.
    Reachability(String),
}

impl InstallWarning {
    /// Short label for the step that produced the warning.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::DependencyInstall(_) => "dependency",
            Self::DesktopIntegration(_) => "desktop integration",
            Self::Reachability(_) => "reachability",
        }
    }

    /// The underlying failure message.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::DependencyInstall(msg)
            | Self::DesktopIntegration(msg)
            | Self::Reachability(msg) => msg,
        }
    }
}

impl fmt::Display for InstallWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category(), self.detail())
    }
}
