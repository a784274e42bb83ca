//! Immutable installer configuration.
//!
//! Every component receives the configuration at construction; nothing is
//! read from the environment or from files.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Download API queried first.
pub const DEFAULT_API_URL: &str = "https://www.cursor.com/api/download";

/// Release track passed to the download API.
pub const DEFAULT_RELEASE_TRACK: &str = "stable";

/// CDN path template used when the API yields nothing.
///
/// Placeholders: `{platform}`, `{kind}`, `{release_track}`.
pub const DEFAULT_CDN_TEMPLATE: &str =
    "https://downloader.cursor.sh/builds/{release_track}/{platform}/{kind}";

/// Redirect URL template used as the last resort.
///
/// Placeholders: `{api}`, `{platform}`, `{release_track}`.
pub const DEFAULT_REDIRECT_TEMPLATE: &str =
    "{api}?platform={platform}&releaseTrack={release_track}&redirect=true";

/// Icon installed next to the AppImage.
pub const DEFAULT_ICON_URL: &str = "https://www.cursor.com/assets/images/logo.png";

/// Browser-like user agent; some CDNs reject default client identifiers.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// How running instances are shut down before replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    /// Wait between the interrupt and the kill signal.
    pub settle_delay: Duration,
    /// Number of process-table polls after the kill signal.
    pub poll_attempts: u32,
    /// Wait between polls.
    pub poll_interval: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            poll_attempts: 5,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl TerminationPolicy {
    /// Same poll count, no waiting. Used by tests.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Filesystem locations used on Linux.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxPaths {
    /// The live AppImage.
    pub appimage: PathBuf,
    /// Desktop icon.
    pub icon: PathBuf,
    /// Desktop entry descriptor.
    pub desktop_entry: PathBuf,
    /// CLI symlink pointing at the AppImage.
    pub cli_link: PathBuf,
}

impl Default for LinuxPaths {
    fn default() -> Self {
        Self {
            appimage: PathBuf::from("/opt/cursor/cursor.AppImage"),
            icon: PathBuf::from("/opt/cursor/cursor.png"),
            desktop_entry: PathBuf::from("/usr/share/applications/cursor.desktop"),
            cli_link: PathBuf::from("/usr/local/bin/cursor"),
        }
    }
}

impl LinuxPaths {
    /// All paths rooted under `root`, mirroring the default layout.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self {
            appimage: root.join("opt/cursor/cursor.AppImage"),
            icon: root.join("opt/cursor/cursor.png"),
            desktop_entry: root.join("usr/share/applications/cursor.desktop"),
            cli_link: root.join("usr/local/bin/cursor"),
        }
    }
}

/// Filesystem locations used on macOS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacPaths {
    /// System applications directory.
    pub applications_dir: PathBuf,
    /// Bundle directory name inside the disk image and the applications dir.
    pub bundle_name: String,
    /// CLI executable relative to the bundle root.
    pub bundle_cli: PathBuf,
    /// CLI symlink pointing into the bundle.
    pub cli_link: PathBuf,
}

impl Default for MacPaths {
    fn default() -> Self {
        Self {
            applications_dir: PathBuf::from("/Applications"),
            bundle_name: "Cursor.app".to_string(),
            bundle_cli: PathBuf::from("Contents/Resources/app/bin/cursor"),
            cli_link: PathBuf::from("/usr/local/bin/cursor"),
        }
    }
}

impl MacPaths {
    /// Installed bundle location.
    #[must_use]
    pub fn bundle_path(&self) -> PathBuf {
        self.applications_dir.join(&self.bundle_name)
    }
}

/// Configuration shared by every installer component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Display name, also used for desktop entry and mount-name matching.
    pub app_name: String,
    /// Download API endpoint.
    pub api_url: String,
    /// Release track query value.
    pub release_track: String,
    /// Second-tier CDN template. Empty disables the tier.
    pub cdn_template: String,
    /// Third-tier redirect template.
    pub redirect_template: String,
    /// Icon download URL.
    pub icon_url: String,
    /// User agent for every HTTP request.
    pub user_agent: String,
    /// Draw a progress bar while downloading.
    pub show_progress: bool,
    /// Install the FUSE runtime when it is missing.
    pub manage_fuse: bool,
    /// Linux paths.
    pub linux: LinuxPaths,
    /// macOS paths.
    pub macos: MacPaths,
    /// Shutdown timing for running instances.
    pub termination: TerminationPolicy,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            app_name: "Cursor".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            release_track: DEFAULT_RELEASE_TRACK.to_string(),
            cdn_template: DEFAULT_CDN_TEMPLATE.to_string(),
            redirect_template: DEFAULT_REDIRECT_TEMPLATE.to_string(),
            icon_url: DEFAULT_ICON_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            show_progress: false,
            manage_fuse: true,
            linux: LinuxPaths::default(),
            macos: MacPaths::default(),
            termination: TerminationPolicy::default(),
        }
    }
}

impl InstallerConfig {
    /// Enable or disable the download progress bar.
    #[must_use]
    pub fn with_progress(mut self, enable: bool) -> Self {
        self.show_progress = enable;
        self
    }

    /// Enable or disable FUSE provisioning.
    #[must_use]
    pub fn with_manage_fuse(mut self, enable: bool) -> Self {
        self.manage_fuse = enable;
        self
    }

    /// Replace the Linux paths.
    #[must_use]
    pub fn with_linux_paths(mut self, paths: LinuxPaths) -> Self {
        self.linux = paths;
        self
    }

    /// Replace the termination policy.
    #[must_use]
    pub fn with_termination(mut self, policy: TerminationPolicy) -> Self {
        self.termination = policy;
        self
    }

    /// Replace the CDN template.
    #[must_use]
    pub fn with_cdn_template(mut self, template: impl Into<String>) -> Self {
        self.cdn_template = template.into();
        self
    }

    /// Process-name fragment of the AppImage loop mount (`.mount_Cursor…`).
    #[must_use]
    pub fn mount_pattern(&self) -> String {
        format!(".mount_{}", self.app_name)
    }
}
