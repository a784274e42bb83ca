//! Linux desktop integration: FUSE runtime, CLI link and desktop entry.

use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::InstallerConfig;

/// Directories searched for `libfuse.so.2`.
const FUSE_LIBRARY_DIRS: &[&str] = &[
    "/usr/lib",
    "/usr/lib64",
    "/lib",
    "/lib64",
    "/usr/lib/x86_64-linux-gnu",
    "/usr/lib/aarch64-linux-gnu",
    "/lib/x86_64-linux-gnu",
    "/lib/aarch64-linux-gnu",
];

/// Supported system package managers, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian / Ubuntu.
    Apt,
    /// Fedora / RHEL 8+.
    Dnf,
    /// Older RHEL / CentOS.
    Yum,
    /// Arch Linux.
    Pacman,
    /// openSUSE.
    Zypper,
}

impl PackageManager {
    const ALL: [Self; 5] = [Self::Apt, Self::Dnf, Self::Yum, Self::Pacman, Self::Zypper];

    /// Executable name.
    #[must_use]
    pub const fn program(&self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
        }
    }

    /// Package providing the FUSE 2 runtime.
    #[must_use]
    pub const fn fuse_package(&self) -> &'static str {
        match self {
            Self::Apt | Self::Zypper => "libfuse2",
            Self::Dnf | Self::Yum => "fuse-libs",
            Self::Pacman => "fuse2",
        }
    }

    /// Arguments for a non-interactive install of `package`.
    #[must_use]
    pub fn install_args(&self, package: &'static str) -> Vec<&'static str> {
        match self {
            Self::Apt | Self::Dnf | Self::Yum => vec!["install", "-y", package],
            Self::Pacman => vec!["-S", "--noconfirm", "--needed", package],
            Self::Zypper => vec!["--non-interactive", "install", package],
        }
    }

    /// First package manager on `PATH`.
    #[must_use]
    pub fn detect() -> Option<Self> {
        Self::detect_in(env::var_os("PATH").as_deref())
    }

    /// First package manager found in `search_path`, a `PATH`-style list.
    #[must_use]
    pub fn detect_in(search_path: Option<&OsStr>) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pm| find_program_in(pm.program(), search_path).is_some())
    }
}

fn find_program(name: &str) -> Option<PathBuf> {
    find_program_in(name, env::var_os("PATH").as_deref())
}

fn find_program_in(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    match which::which_in(name, search_path, cwd) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::debug!("{} not found: {}", name, e);
            None
        }
    }
}

/// Whether a FUSE 2 runtime library is installed.
#[must_use]
pub fn fuse_available() -> bool {
    FUSE_LIBRARY_DIRS
        .iter()
        .any(|dir| Path::new(dir).join("libfuse.so.2").exists())
}

/// Makes sure AppImages can mount themselves.
pub fn ensure_fuse() -> Result<(), String> {
    if fuse_available() {
        tracing::debug!("FUSE runtime already present");
        return Ok(());
    }

    let pm = PackageManager::detect()
        .ok_or_else(|| "libfuse.so.2 is missing and no supported package manager was found".to_string())?;
    let package = pm.fuse_package();
    tracing::info!("Installing {} with {}", package, pm.program());

    let mut command = match find_program("sudo") {
        Some(sudo) => {
            let mut cmd = Command::new(sudo);
            cmd.arg(pm.program());
            cmd
        }
        None => Command::new(pm.program()),
    };
    let status = command
        .args(pm.install_args(package))
        .status()
        .map_err(|e| format!("failed to run {}: {e}", pm.program()))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("{} install {package} exited with {status}", pm.program()))
    }
}

/// Points `link` at `target`, replacing whatever was there.
pub fn link_cli(target: &Path, link: &Path) -> io::Result<()> {
    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)?;
    }
    if link.symlink_metadata().is_ok() {
        fs::remove_file(link)?;
    }
    symlink(target, link)?;
    tracing::info!("Linked {} -> {}", link.display(), target.display());
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Contents of the `.desktop` launcher.
#[must_use]
pub fn render_desktop_entry(config: &InstallerConfig) -> String {
    let name = &config.app_name;
    let exec = config.linux.appimage.display();
    let icon = config.linux.icon.display();
    format!(
        "[Desktop Entry]\n\
         Name={name}\n\
         Comment=The AI Code Editor\n\
         Exec={exec} --no-sandbox %F\n\
         Icon={icon}\n\
         Type=Application\n\
         Categories=Development;IDE;TextEditor;\n\
         MimeType=text/plain;inode/directory;\n\
         StartupWMClass={name}\n\
         Terminal=false\n"
    )
}

/// Writes the desktop entry, creating its directory.
pub fn write_desktop_entry(config: &InstallerConfig) -> io::Result<()> {
    let path = &config.linux.desktop_entry;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_desktop_entry(config))?;
    tracing::info!("Wrote desktop entry {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinuxPaths;

    #[test]
    fn test_desktop_entry_references_paths() {
        let config = InstallerConfig::default();
        let entry = render_desktop_entry(&config);
        assert!(entry.starts_with("[Desktop Entry]\n"));
        assert!(entry.contains("Exec=/opt/cursor/cursor.AppImage --no-sandbox %F\n"));
        assert!(entry.contains("Icon=/opt/cursor/cursor.png\n"));
        assert!(entry.contains("Name=Cursor\n"));
    }

    #[test]
    fn test_write_desktop_entry_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            InstallerConfig::default().with_linux_paths(LinuxPaths::under(dir.path()));
        write_desktop_entry(&config).unwrap();
        let written = fs::read_to_string(&config.linux.desktop_entry).unwrap();
        assert_eq!(written, render_desktop_entry(&config));
    }

    #[cfg(unix)]
    #[test]
    fn test_link_cli_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("app.AppImage");
        fs::write(&target, b"bin").unwrap();
        let link = dir.path().join("bin/cursor");
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        fs::write(&link, b"stale").unwrap();

        link_cli(&target, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target);

        // Idempotent.
        link_cli(&target, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), target);
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_searches_path_list() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("run/current-system/sw/bin");
        fs::create_dir_all(&bin).unwrap();
        assert_eq!(PackageManager::detect_in(Some(bin.as_os_str())), None);

        let zypper = bin.join("zypper");
        fs::write(&zypper, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&zypper, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(
            PackageManager::detect_in(Some(bin.as_os_str())),
            Some(PackageManager::Zypper)
        );
        assert_eq!(find_program_in("zypper", Some(bin.as_os_str())), Some(zypper));
    }

    #[test]
    fn test_package_manager_args() {
        assert_eq!(
            PackageManager::Apt.install_args(PackageManager::Apt.fuse_package()),
            vec!["install", "-y", "libfuse2"]
        );
        assert_eq!(PackageManager::Pacman.fuse_package(), "fuse2");
        assert_eq!(PackageManager::Dnf.fuse_package(), "fuse-libs");
    }
}
