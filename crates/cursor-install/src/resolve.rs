//! Download URL resolution.
//!
//! Three tiers are tried in order and the first non-empty URL wins:
//!
//! 1. The download API, with `downloadUrl` pulled out of the raw body.
//! 2. A hard-coded CDN path for the platform and artifact kind.
//! 3. A redirect URL on the download API that the server resolves.
//!
//! The resolver never fails. Whether the URL is reachable is the fetcher's
//! problem.

use std::fmt;

use crate::config::{DEFAULT_REDIRECT_TEMPLATE, InstallerConfig};
use crate::download::Transport;
use crate::platform::{Arch, OsFamily, PlatformKey};

/// Installable artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Linux AppImage.
    AppImage,
    /// macOS disk image.
    Dmg,
    /// Windows installer package.
    Msi,
}

impl ArtifactKind {
    /// Artifact kind shipped for an OS family.
    #[must_use]
    pub const fn for_os(os: OsFamily) -> Self {
        match os {
            OsFamily::Linux => Self::AppImage,
            OsFamily::Darwin => Self::Dmg,
            OsFamily::Windows => Self::Msi,
        }
    }

    /// Path segment used by the CDN.
    #[must_use]
    pub const fn cdn_segment(&self) -> &'static str {
        match self {
            Self::AppImage => "appImage",
            Self::Dmg => "dmg",
            Self::Msi => "msi",
        }
    }

    /// File extension of the artifact.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::AppImage => "AppImage",
            Self::Dmg => "dmg",
            Self::Msi => "msi",
        }
    }
}

/// Which tier produced a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    /// `downloadUrl` from the download API.
    Api,
    /// Hard-coded CDN template.
    Cdn,
    /// Server-side redirect on the download API.
    Redirect,
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Api => "download API",
            Self::Cdn => "CDN template",
            Self::Redirect => "redirect URL",
        };
        f.write_str(label)
    }
}

/// Resolved download location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// URL to fetch.
    pub url: String,
    /// Artifact expected at the URL.
    pub kind: ArtifactKind,
    /// Tier that produced the URL.
    pub tier: ResolutionTier,
}

/// Platform token understood by the download API.
#[must_use]
pub fn api_platform_token(key: PlatformKey) -> &'static str {
    match (key.os, key.arch) {
        (OsFamily::Linux, Arch::X64) => "linux-x64",
        (OsFamily::Linux, Arch::Arm64) => "linux-arm64",
        (OsFamily::Darwin, Arch::Arm64) => "darwin-arm64",
        (OsFamily::Darwin, Arch::X64) => "darwin-universal",
        (OsFamily::Windows, Arch::X64) => "windows-x64",
        (OsFamily::Windows, Arch::Arm64) => "windows-arm64",
    }
}

/// Platform token used in CDN paths.
#[must_use]
pub fn cdn_platform_token(key: PlatformKey) -> &'static str {
    match (key.os, key.arch) {
        (OsFamily::Linux, Arch::X64) => "linux-x64",
        (OsFamily::Linux, Arch::Arm64) => "linux-arm64",
        (OsFamily::Darwin, Arch::X64) => "mac-x64",
        (OsFamily::Darwin, Arch::Arm64) => "mac-arm64",
        (OsFamily::Windows, Arch::X64) => "win32-x64",
        (OsFamily::Windows, Arch::Arm64) => "win32-arm64",
    }
}

/// Pulls the `downloadUrl` string value out of a raw response body.
///
/// This is a literal key search, not a JSON parse, so it tolerates
/// surrounding format drift. Returns `None` when the key is missing or the
/// value is empty.
#[must_use]
pub fn extract_download_url(body: &str) -> Option<String> {
    const KEY: &str = "\"downloadUrl\"";

    let after_key = &body[body.find(KEY)? + KEY.len()..];
    let after_colon = after_key.trim_start().strip_prefix(':')?.trim_start();
    let value = after_colon.strip_prefix('"')?;
    let end = value.find('"')?;
    let url = value[..end].replace("\\/", "/");

    if url.trim().is_empty() {
        None
    } else {
        Some(url)
    }
}

/// Chooses among the tiers given the tier-1 result.
#[must_use]
pub fn select_url(
    api_url: Option<String>,
    key: PlatformKey,
    config: &InstallerConfig,
) -> DownloadTarget {
    let kind = ArtifactKind::for_os(key.os);

    if let Some(url) = api_url.filter(|u| !u.is_empty()) {
        return DownloadTarget {
            url,
            kind,
            tier: ResolutionTier::Api,
        };
    }

    let cdn = cdn_url(key, config);
    if !cdn.is_empty() {
        return DownloadTarget {
            url: cdn,
            kind,
            tier: ResolutionTier::Cdn,
        };
    }

    DownloadTarget {
        url: redirect_url(key, config),
        kind,
        tier: ResolutionTier::Redirect,
    }
}

fn cdn_url(key: PlatformKey, config: &InstallerConfig) -> String {
    if config.cdn_template.trim().is_empty() {
        return String::new();
    }
    config
        .cdn_template
        .replace("{release_track}", &config.release_track)
        .replace("{platform}", cdn_platform_token(key))
        .replace("{kind}", ArtifactKind::for_os(key.os).cdn_segment())
}

fn redirect_url(key: PlatformKey, config: &InstallerConfig) -> String {
    let template = if config.redirect_template.trim().is_empty() {
        DEFAULT_REDIRECT_TEMPLATE
    } else {
        config.redirect_template.as_str()
    };
    template
        .replace("{api}", &config.api_url)
        .replace("{platform}", api_platform_token(key))
        .replace("{release_track}", &config.release_track)
}

/// Resolves the download URL for a platform.
pub struct UrlResolver<'a> {
    config: &'a InstallerConfig,
    transport: &'a dyn Transport,
}

impl<'a> UrlResolver<'a> {
    /// Creates a resolver using `transport` for the API query.
    pub fn new(config: &'a InstallerConfig, transport: &'a dyn Transport) -> Self {
        Self { config, transport }
    }

    /// URL of the tier-1 API query for `key`.
    #[must_use]
    pub fn api_query_url(&self, key: PlatformKey) -> String {
        format!(
            "{}?platform={}&releaseTrack={}",
            self.config.api_url,
            api_platform_token(key),
            self.config.release_track
        )
    }

    /// Runs the fallback chain. Always returns a non-empty URL.
    pub fn resolve(&self, key: PlatformKey) -> DownloadTarget {
        let query = self.api_query_url(key);
        let api_url = match self.transport.get_text(&query) {
            Ok(body) => extract_download_url(&body),
            Err(e) => {
                tracing::debug!("Download API query failed: {}", e);
                None
            }
        };

        if api_url.is_none() {
            tracing::info!("Download API returned no URL for {}, using fallback", key);
        }

        let target = select_url(api_url, key, self.config);
        tracing::info!("Resolved {} via {}: {}", key, target.tier, target.url);
        target
    }
}
