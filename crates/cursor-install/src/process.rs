//! Process-table access for shutting down running instances.

use sysinfo::{Pid, Signal, System};

use crate::error::{InstallError, Result};

/// Signals the installer sends to running instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Polite shutdown request (SIGINT).
    Interrupt,
    /// Forced termination (SIGKILL).
    Kill,
}

impl SignalKind {
    fn to_sysinfo(self) -> Signal {
        match self {
            Self::Interrupt => Signal::Interrupt,
            Self::Kill => Signal::Kill,
        }
    }
}

/// Lists and signals processes.
pub trait ProcessProbe {
    /// PIDs whose name, executable path or command line contains `pattern`.
    fn list_matching(&self, pattern: &str) -> Vec<u32>;

    /// Sends `kind` to `pid`.
    fn signal(&self, pid: u32, kind: SignalKind) -> Result<()>;
}

/// [`ProcessProbe`] backed by the native process table via `sysinfo`.
#[derive(Debug, Default)]
pub struct SystemProbe;

impl SystemProbe {
    fn snapshot() -> System {
        let mut system = System::new();
        system.refresh_processes();
        system
    }
}

impl ProcessProbe for SystemProbe {
    fn list_matching(&self, pattern: &str) -> Vec<u32> {
        let own_pid = std::process::id();
        let system = Self::snapshot();

        let mut pids: Vec<u32> = system
            .processes()
            .iter()
            .filter(|(pid, _)| pid.as_u32() != own_pid)
            .filter(|(_, process)| {
                process.name().contains(pattern)
                    || process
                        .exe()
                        .is_some_and(|exe| exe.to_string_lossy().contains(pattern))
                    || process.cmd().iter().any(|arg| arg.contains(pattern))
            })
            .map(|(pid, _)| pid.as_u32())
            .collect();
        pids.sort_unstable();
        pids
    }

    fn signal(&self, pid: u32, kind: SignalKind) -> Result<()> {
        let system = Self::snapshot();
        let Some(process) = system.process(Pid::from_u32(pid)) else {
            // Already gone.
            return Ok(());
        };

        match process.kill_with(kind.to_sysinfo()) {
            Some(true) => Ok(()),
            Some(false) => Err(InstallError::Io(format!(
                "failed to send {kind:?} to process {pid}"
            ))),
            None => Err(InstallError::Io(format!(
                "{kind:?} is not supported on this platform"
            ))),
        }
    }
}
