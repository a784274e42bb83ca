//! Platform detection.
//!
//! Maps the host kernel name and machine architecture onto the canonical
//! `PlatformKey` used to pick download URLs and install logic.

use std::fmt;

use crate::error::{InstallError, Result};

/// Supported operating system families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// Linux.
    Linux,
    /// macOS / Darwin.
    Darwin,
    /// Microsoft Windows (including Cygwin/MinGW/MSYS shells).
    Windows,
}

impl OsFamily {
    /// Parse a kernel name as printed by `uname -s`.
    #[must_use]
    pub fn from_kernel(kernel: &str) -> Option<Self> {
        match kernel {
            "Linux" => Some(Self::Linux),
            "Darwin" => Some(Self::Darwin),
            "Windows_NT" => Some(Self::Windows),
            k if ["CYGWIN", "MINGW", "MSYS"]
                .iter()
                .any(|prefix| k.starts_with(prefix)) =>
            {
                Some(Self::Windows)
            }
            _ => None,
        }
    }

    /// Lowercase name used in URLs and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    /// Get a human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Linux => "Linux",
            Self::Darwin => "macOS",
            Self::Windows => "Windows",
        }
    }
}

/// Supported CPU architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// x86_64 / AMD64.
    X64,
    /// ARM64 / AArch64 / Apple Silicon.
    Arm64,
}

impl Arch {
    /// Parse a machine name as printed by `uname -m`.
    #[must_use]
    pub fn from_machine(machine: &str) -> Option<Self> {
        match machine {
            "x86_64" | "amd64" => Some(Self::X64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }

    /// Lowercase name used in URLs and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

/// Canonical (OS family, CPU architecture) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformKey {
    /// The operating system family.
    pub os: OsFamily,
    /// The CPU architecture.
    pub arch: Arch,
}

impl PlatformKey {
    /// Build a key from explicit parts.
    #[must_use]
    pub const fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Resolve a key from `uname`-style kernel and machine names.
    pub fn from_uname(kernel: &str, machine: &str) -> Result<Self> {
        let unsupported = || InstallError::UnsupportedPlatform {
            kernel: kernel.to_string(),
            machine: machine.to_string(),
        };
        let os = OsFamily::from_kernel(kernel).ok_or_else(unsupported)?;
        let arch = Arch::from_machine(machine).ok_or_else(unsupported)?;
        Ok(Self { os, arch })
    }

    /// Detect the running platform.
    pub fn detect() -> Result<Self> {
        let (kernel, machine) = host_uname();
        tracing::debug!("Host reports kernel '{}', machine '{}'", kernel, machine);
        Self::from_uname(kernel, machine)
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Kernel and machine names of the host, spelled the way `uname` prints them.
fn host_uname() -> (&'static str, &'static str) {
    let kernel = match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        other => other,
    };
    (kernel, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_supported_pairs() {
        let cases = [
            ("Linux", "x86_64", OsFamily::Linux, Arch::X64),
            ("Linux", "aarch64", OsFamily::Linux, Arch::Arm64),
            ("Darwin", "arm64", OsFamily::Darwin, Arch::Arm64),
            ("Darwin", "x86_64", OsFamily::Darwin, Arch::X64),
            ("MINGW64_NT-10.0", "x86_64", OsFamily::Windows, Arch::X64),
            ("CYGWIN_NT-10.0", "amd64", OsFamily::Windows, Arch::X64),
            ("MSYS_NT-10.0", "arm64", OsFamily::Windows, Arch::Arm64),
        ];
        for (kernel, machine, os, arch) in cases {
            let key = PlatformKey::from_uname(kernel, machine).unwrap();
            assert_eq!(key, PlatformKey::new(os, arch), "{kernel}/{machine}");
        }
    }

    #[test]
    fn test_unknown_kernel_fails() {
        let err = PlatformKey::from_uname("FreeBSD", "x86_64").unwrap_err();
        assert!(matches!(err, InstallError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn test_unknown_arch_fails() {
        let err = PlatformKey::from_uname("Linux", "riscv64").unwrap_err();
        assert!(
            matches!(err, InstallError::UnsupportedPlatform { machine, .. } if machine == "riscv64")
        );
    }

    #[test]
    fn test_display() {
        let key = PlatformKey::new(OsFamily::Darwin, Arch::Arm64);
        assert_eq!(key.to_string(), "darwin-arm64");
    }

    #[cfg(all(
        any(target_os = "linux", target_os = "macos", target_os = "windows"),
        any(target_arch = "x86_64", target_arch = "aarch64")
    ))]
    #[test]
    fn test_detect_matches_host() {
        let key = PlatformKey::detect().unwrap();
        let expected_os = match std::env::consts::OS {
            "macos" => OsFamily::Darwin,
            "windows" => OsFamily::Windows,
            _ => OsFamily::Linux,
        };
        let expected_arch = match std::env::consts::ARCH {
            "aarch64" => Arch::Arm64,
            _ => Arch::X64,
        };
        assert_eq!(key, PlatformKey::new(expected_os, expected_arch));
    }

    proptest! {
        #[test]
        fn prop_unknown_machine_is_rejected(machine in "[a-z0-9_]{1,12}") {
            prop_assume!(Arch::from_machine(&machine).is_none());
            prop_assert!(PlatformKey::from_uname("Linux", &machine).is_err());
        }

        #[test]
        fn prop_unknown_kernel_is_rejected(kernel in "[A-Za-z]{1,12}") {
            prop_assume!(OsFamily::from_kernel(&kernel).is_none());
            prop_assert!(PlatformKey::from_uname(&kernel, "x86_64").is_err());
        }
    }
}
