//! Runs detection, resolution and installation in order.

use crate::config::InstallerConfig;
use crate::download::Transport;
use crate::error::{InstallWarning, Result};
use crate::install::{InstallOutcome, LinuxInstaller, MacInstaller, WindowsInstaller};
use crate::platform::{OsFamily, PlatformKey};
use crate::process::ProcessProbe;
use crate::resolve::{DownloadTarget, UrlResolver};

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Platform the run targeted.
    pub platform: PlatformKey,
    /// Resolved download.
    pub target: DownloadTarget,
    /// What was installed.
    pub outcome: InstallOutcome,
    /// Non-fatal problems, in the order they happened.
    pub warnings: Vec<InstallWarning>,
}

/// Sequences the installer components. No retries happen here.
pub struct Orchestrator<'a> {
    config: &'a InstallerConfig,
    transport: &'a dyn Transport,
    probe: &'a dyn ProcessProbe,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator over the given capabilities.
    pub fn new(
        config: &'a InstallerConfig,
        transport: &'a dyn Transport,
        probe: &'a dyn ProcessProbe,
    ) -> Self {
        Self {
            config,
            transport,
            probe,
        }
    }

    /// Detects the host platform and installs for it.
    pub fn run(&self) -> Result<InstallReport> {
        let platform = PlatformKey::detect()?;
        self.run_for(platform)
    }

    /// Installs for an explicit platform.
    pub fn run_for(&self, platform: PlatformKey) -> Result<InstallReport> {
        tracing::info!(
            "Installing {} for {} ({})",
            self.config.app_name,
            platform.os.display_name(),
            platform.arch.as_str()
        );

        let target = UrlResolver::new(self.config, self.transport).resolve(platform);

        let mut warnings = Vec::new();
        if let Err(e) = self.transport.probe(&target.url) {
            let warning = InstallWarning::Reachability(format!("{}: {e}", target.url));
            tracing::warn!("Download URL may be unreachable, trying anyway: {}", e);
            warnings.push(warning);
        }

        let summary = match platform.os {
            OsFamily::Linux => {
                LinuxInstaller::new(self.config, self.transport, self.probe).install(&target)?
            }
            OsFamily::Darwin => MacInstaller::new(self.config, self.transport).install(&target)?,
            OsFamily::Windows => {
                WindowsInstaller::new(self.config, self.transport).install(&target)?
            }
        };
        warnings.extend(summary.warnings);

        tracing::info!("{} {}", self.config.app_name, summary.outcome);
        Ok(InstallReport {
            platform,
            target,
            outcome: summary.outcome,
            warnings,
        })
    }
}
