//! Platform-specific installation.
//!
//! - **Linux**: AppImage safe-replace with process shutdown, backup and rollback
//! - **macOS**: DMG mount and bundle copy into the applications directory
//! - **Windows**: unattended MSI install through `msiexec`

use std::fmt;
use std::path::PathBuf;

use crate::error::InstallWarning;

pub mod desktop;
pub mod linux;
pub mod macos;
pub mod windows;

pub use linux::{LinuxInstaller, ReplaceState};
pub use macos::MacInstaller;
pub use windows::WindowsInstaller;

/// What an installer left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The artifact is installed at `path`.
    Installed {
        /// AppImage file or application bundle.
        path: PathBuf,
    },
    /// The platform package installer completed.
    PackageInstalled {
        /// Product the package installed.
        product: String,
    },
    /// The installer package must be run by the operator.
    ManualActionRequired {
        /// Downloaded installer package.
        installer: PathBuf,
    },
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed { path } => write!(f, "installed at {}", path.display()),
            Self::PackageInstalled { product } => {
                write!(f, "{product} installed by the system package installer")
            }
            Self::ManualActionRequired { installer } => {
                write!(f, "run {} to finish installing", installer.display())
            }
        }
    }
}

/// Result of a successful installer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSummary {
    /// Final state of the installation.
    pub outcome: InstallOutcome,
    /// Non-fatal problems from follow-up steps.
    pub warnings: Vec<InstallWarning>,
}

impl InstallSummary {
    /// Summary without warnings.
    #[must_use]
    pub fn new(outcome: InstallOutcome) -> Self {
        Self {
            outcome,
            warnings: Vec::new(),
        }
    }
}
