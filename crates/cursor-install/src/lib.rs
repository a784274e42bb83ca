//! Installer and updater for the Cursor editor.
//!
//! The crate detects the host platform, resolves a download URL for the
//! latest stable build and installs it:
//!
//! - **Linux**: AppImage under `/opt/cursor`, replaced safely. Running
//!   instances are stopped first, the previous build is backed up, and a
//!   failed download restores it.
//! - **macOS**: DMG mounted and the bundle copied into `/Applications`.
//! - **Windows**: MSI installed unattended through `msiexec`.
//!
//! # Architecture
//!
//! Components are plain structs that borrow an [`InstallerConfig`] and the
//! two capabilities they need from the outside world:
//!
//! - [`Transport`] for HTTP (implemented by [`HttpTransport`])
//! - [`ProcessProbe`] for the process table (implemented by [`SystemProbe`])
//!
//! [`Orchestrator`] ties them together.
//!
//! # Example
//!
//! ```no_run
//! use cursor_install::{HttpTransport, InstallerConfig, Orchestrator, SystemProbe};
//!
//! fn install() -> cursor_install::Result<()> {
//!     let config = InstallerConfig::default();
//!     let transport = HttpTransport::new(&config)?;
//!     let report = Orchestrator::new(&config, &transport, &SystemProbe).run()?;
//!     println!("{}", report.outcome);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backup;
pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod orchestrator;
pub mod platform;
pub mod process;
pub mod resolve;

pub use config::{InstallerConfig, LinuxPaths, MacPaths, TerminationPolicy};
pub use download::{HttpTransport, Transport, format_bytes};
pub use error::{InstallError, InstallWarning, Result};
pub use install::{InstallOutcome, InstallSummary, ReplaceState};
pub use orchestrator::{InstallReport, Orchestrator};
pub use platform::{Arch, OsFamily, PlatformKey};
pub use process::{ProcessProbe, SignalKind, SystemProbe};
pub use resolve::{ArtifactKind, DownloadTarget, ResolutionTier, UrlResolver};

/// Version of this installer.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
