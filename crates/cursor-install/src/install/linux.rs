//! Linux AppImage installation with safe replacement.
//!
//! The live AppImage is only ever absent, the previous build, or the new
//! build:
//!
//! 1. Running instances are interrupted, then killed, then polled until the
//!    process table is quiet. If they refuse to exit nothing is touched.
//! 2. The live file is copied to a timestamped backup and removed.
//! 3. The new build is fetched straight into the live path.
//! 4. If that fetch fails, the latest backup is copied back and the run fails.
//!
//! Once the new build is in place the CLI link, icon, desktop entry and FUSE
//! runtime are refreshed. Failures there only produce warnings.

use std::fs;
use std::path::Path;
use std::thread;

use crate::backup;
use crate::config::InstallerConfig;
use crate::download::Transport;
use crate::error::{InstallError, InstallWarning, Result};
use crate::install::desktop;
use crate::install::{InstallOutcome, InstallSummary};
use crate::process::{ProcessProbe, SignalKind};
use crate::resolve::DownloadTarget;

/// States of the live AppImage during a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceState {
    /// No AppImage at the live path.
    Absent,
    /// AppImage present, no instance running.
    PresentIdle,
    /// AppImage present and in use.
    PresentRunning,
    /// Backup taken, live path emptied.
    BackedUp,
    /// New build installed.
    Replaced,
    /// Fetch failed, previous build restored.
    RolledBack,
}

/// Installs the AppImage build on Linux.
pub struct LinuxInstaller<'a> {
    config: &'a InstallerConfig,
    transport: &'a dyn Transport,
    probe: &'a dyn ProcessProbe,
}

impl<'a> LinuxInstaller<'a> {
    /// Creates an installer using the given transport and process probe.
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

    /// Replaces the AppImage, then refreshes the desktop integration.
    pub fn install(&self, target: &DownloadTarget) -> Result<InstallSummary> {
        self.replace(&target.url)?;

        let warnings = self.integrate();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        Ok(InstallSummary {
            outcome: InstallOutcome::Installed {
                path: self.config.linux.appimage.clone(),
            },
            warnings,
        })
    }

    /// Runs the safe-replace sequence and returns the final state.
    ///
    /// Only ever returns `Ok(ReplaceState::Replaced)`; every other terminal
    /// state is an error.
    pub fn replace(&self, url: &str) -> Result<ReplaceState> {
        let live = self.config.linux.appimage.as_path();

        if !live.exists() {
            self.transition(ReplaceState::Absent);
            if let Some(parent) = live.parent() {
                fs::create_dir_all(parent)?;
            }
            if let Err(e) = self.transport.fetch(url, live) {
                remove_partial(live);
                return Err(download_failed(url, e));
            }
            make_executable(live)?;
            self.transition(ReplaceState::Replaced);
            return Ok(ReplaceState::Replaced);
        }

        let running = self.stop_running_instances()?;
        self.transition(if running {
            ReplaceState::PresentRunning
        } else {
            ReplaceState::PresentIdle
        });

        backup::create(live)?;
        fs::remove_file(live).map_err(|e| {
            InstallError::Backup(format!("failed to remove {}: {e}", live.display()))
        })?;
        self.transition(ReplaceState::BackedUp);

        match self.transport.fetch(url, live) {
            Ok(_) => {
                make_executable(live)?;
                self.transition(ReplaceState::Replaced);
                Ok(ReplaceState::Replaced)
            }
            Err(e) => {
                let reason = failure_reason(e);
                tracing::error!("Download failed, restoring previous build: {}", reason);
                match backup::restore_latest(live) {
                    Ok(_) => {
                        self.transition(ReplaceState::RolledBack);
                        Err(InstallError::DownloadFailed {
                            url: url.to_string(),
                            reason,
                        })
                    }
                    Err(restore) => {
                        remove_partial(live);
                        Err(InstallError::RollbackFailed {
                            reason,
                            restore: restore.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// PIDs of processes using the AppImage or its loop mount.
    fn running_pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self
            .patterns()
            .iter()
            .flat_map(|pattern| self.probe.list_matching(pattern))
            .collect();
        pids.sort_unstable();
        pids.dedup();
        pids
    }

    fn patterns(&self) -> Vec<String> {
        let mut patterns = vec![self.config.mount_pattern()];
        if let Some(name) = self.config.linux.appimage.file_name() {
            patterns.insert(0, name.to_string_lossy().into_owned());
        }
        patterns
    }

    /// Shuts down running instances. Returns whether any were running.
    fn stop_running_instances(&self) -> Result<bool> {
        let policy = self.config.termination;
        let pids = self.running_pids();
        if pids.is_empty() {
            return Ok(false);
        }

        tracing::info!(
            "{} is running ({} process(es)), asking it to exit",
            self.config.app_name,
            pids.len()
        );
        self.signal_all(&pids, SignalKind::Interrupt);
        thread::sleep(policy.settle_delay);

        let survivors = self.running_pids();
        if !survivors.is_empty() {
            tracing::info!("Force-stopping {} process(es)", survivors.len());
            self.signal_all(&survivors, SignalKind::Kill);
        }

        for attempt in 1..=policy.poll_attempts {
            thread::sleep(policy.poll_interval);
            let remaining = self.running_pids();
            if remaining.is_empty() {
                tracing::info!("All instances stopped");
                return Ok(true);
            }
            tracing::debug!(
                "Attempt {}/{}: {} process(es) still running",
                attempt,
                policy.poll_attempts,
                remaining.len()
            );
        }

        Err(InstallError::ProcessTerminationTimeout {
            remaining: self.running_pids(),
        })
    }

    fn signal_all(&self, pids: &[u32], kind: SignalKind) {
        for &pid in pids {
            if let Err(e) = self.probe.signal(pid, kind) {
                tracing::debug!("Signal {:?} to {} failed: {}", kind, pid, e);
            }
        }
    }

    /// Post-install steps. Each failure becomes a warning.
    fn integrate(&self) -> Vec<InstallWarning> {
        let paths = &self.config.linux;
        let mut warnings = Vec::new();

        if self.config.manage_fuse
            && let Err(e) = desktop::ensure_fuse()
        {
            warnings.push(InstallWarning::DependencyInstall(e));
        }

        if let Err(e) = desktop::link_cli(&paths.appimage, &paths.cli_link) {
            warnings.push(InstallWarning::DesktopIntegration(format!(
                "failed to link {}: {e}",
                paths.cli_link.display()
            )));
        }

        if let Err(e) = self.fetch_icon() {
            warnings.push(InstallWarning::DesktopIntegration(format!(
                "failed to fetch icon: {e}"
            )));
        }

        if let Err(e) = desktop::write_desktop_entry(self.config) {
            warnings.push(InstallWarning::DesktopIntegration(format!(
                "failed to write {}: {e}",
                paths.desktop_entry.display()
            )));
        }

        warnings
    }

    fn fetch_icon(&self) -> Result<()> {
        let icon = &self.config.linux.icon;
        if let Some(parent) = icon.parent() {
            fs::create_dir_all(parent)?;
        }
        self.transport.fetch(&self.config.icon_url, icon)?;
        Ok(())
    }

    fn transition(&self, state: ReplaceState) {
        tracing::debug!(
            "{}: {:?}",
            self.config.linux.appimage.display(),
            state
        );
    }
}

/// Leaves the live path absent rather than holding a truncated build.
fn remove_partial(live: &Path) {
    if live.symlink_metadata().is_ok()
        && let Err(e) = fs::remove_file(live)
    {
        tracing::warn!("Failed to remove partial download {}: {}", live.display(), e);
    }
}

fn failure_reason(err: InstallError) -> String {
    match err {
        InstallError::DownloadFailed { reason, .. } => reason,
        other => other.to_string(),
    }
}

fn download_failed(url: &str, err: InstallError) -> InstallError {
    InstallError::DownloadFailed {
        url: url.to_string(),
        reason: failure_reason(err),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LinuxPaths, TerminationPolicy};
    use std::cell::RefCell;
    use std::path::PathBuf;

    struct StaticTransport {
        payload: Option<&'static [u8]>,
        fetched: RefCell<Vec<PathBuf>>,
    }

    impl Transport for StaticTransport {
        fn get_text(&self, _url: &str) -> Result<String> {
            Ok(String::new())
        }

        fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
            self.fetched.borrow_mut().push(dest.to_path_buf());
            match self.payload {
                Some(bytes) => {
                    fs::write(dest, bytes)?;
                    Ok(bytes.len() as u64)
                }
                None => {
                    fs::write(dest, b"trunc")?;
                    Err(InstallError::DownloadFailed {
                        url: url.to_string(),
                        reason: "connection reset".to_string(),
                    })
                }
            }
        }

        fn probe(&self, _url: &str) -> Result<()> {
            Ok(())
        }
    }

    struct IdleProbe;

    impl ProcessProbe for IdleProbe {
        fn list_matching(&self, _pattern: &str) -> Vec<u32> {
            Vec::new()
        }

        fn signal(&self, _pid: u32, _kind: SignalKind) -> Result<()> {
            Ok(())
        }
    }

    fn config(root: &Path) -> InstallerConfig {
        InstallerConfig::default()
            .with_linux_paths(LinuxPaths::under(root))
            .with_termination(TerminationPolicy::immediate())
            .with_manage_fuse(false)
    }

    #[test]
    fn test_absent_fetches_directly() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let transport = StaticTransport {
            payload: Some(b"new"),
            fetched: RefCell::new(Vec::new()),
        };
        let installer = LinuxInstaller::new(&config, &transport, &IdleProbe);

        let state = installer.replace("https://cdn.example/a").unwrap();
        assert_eq!(state, ReplaceState::Replaced);
        assert_eq!(fs::read(&config.linux.appimage).unwrap(), b"new");
        assert!(backup::list(&config.linux.appimage).unwrap().is_empty());
    }

    #[test]
    fn test_absent_failed_fetch_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let transport = StaticTransport {
            payload: None,
            fetched: RefCell::new(Vec::new()),
        };
        let installer = LinuxInstaller::new(&config, &transport, &IdleProbe);

        let err = installer.replace("https://cdn.example/a").unwrap_err();
        assert!(
            matches!(err, InstallError::DownloadFailed { ref reason, .. } if reason == "connection reset")
        );
        assert!(!config.linux.appimage.exists());
    }

    #[test]
    fn test_patterns_cover_file_and_mount() {
        let config = InstallerConfig::default();
        let transport = StaticTransport {
            payload: None,
            fetched: RefCell::new(Vec::new()),
        };
        let installer = LinuxInstaller::new(&config, &transport, &IdleProbe);
        assert_eq!(
            installer.patterns(),
            vec!["cursor.AppImage".to_string(), ".mount_Cursor".to_string()]
        );
    }

    #[test]
    fn test_integration_steps_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let transport = StaticTransport {
            payload: Some(b"png"),
            fetched: RefCell::new(Vec::new()),
        };
        let installer = LinuxInstaller::new(&config, &transport, &IdleProbe);

        let warnings = installer.integrate();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(fs::read(&config.linux.icon).unwrap(), b"png");
        assert!(config.linux.desktop_entry.exists());
        assert!(config.linux.cli_link.symlink_metadata().is_ok());
    }

    #[test]
    fn test_icon_failure_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let transport = StaticTransport {
            payload: None,
            fetched: RefCell::new(Vec::new()),
        };
        let installer = LinuxInstaller::new(&config, &transport, &IdleProbe);

        let warnings = installer.integrate();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], InstallWarning::DesktopIntegration(msg) if msg.contains("icon")));
        assert!(config.linux.desktop_entry.exists());
    }
}
