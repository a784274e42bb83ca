//! Test doubles for the transport and the process table.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cursor_install::{
    InstallError, InstallerConfig, LinuxPaths, ProcessProbe, Result, SignalKind, TerminationPolicy,
    Transport,
};

/// Canned response for a URL.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Body returned by `get_text` and written by `fetch`.
    Body(Vec<u8>),
    /// `fetch` writes the bytes, then fails as if the connection dropped.
    Truncated(Vec<u8>),
}

/// Transport serving canned replies; unknown URLs fail.
#[derive(Default)]
pub struct FakeTransport {
    replies: HashMap<String, Reply>,
    pub fetched: RefCell<Vec<String>>,
    pub probed: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    pub fn body(self, url: &str, body: &[u8]) -> Self {
        self.with(url, Reply::Body(body.to_vec()))
    }
}

impl Transport for FakeTransport {
    fn get_text(&self, url: &str) -> Result<String> {
        match self.replies.get(url) {
            Some(Reply::Body(body)) => Ok(String::from_utf8_lossy(body).into_owned()),
            _ => Err(InstallError::Network(format!("no route to {url}"))),
        }
    }

    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        self.fetched.borrow_mut().push(url.to_string());
        let failed = |reason: &str| InstallError::DownloadFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        match self.replies.get(url) {
            Some(Reply::Body(body)) => {
                fs::write(dest, body)?;
                Ok(body.len() as u64)
            }
            Some(Reply::Truncated(partial)) => {
                fs::write(dest, partial)?;
                Err(failed("connection reset by peer"))
            }
            None => Err(failed("404 Not Found")),
        }
    }

    fn probe(&self, url: &str) -> Result<()> {
        self.probed.borrow_mut().push(url.to_string());
        if self.replies.contains_key(url) {
            Ok(())
        } else {
            Err(InstallError::Network(format!("HEAD {url} returned 404")))
        }
    }
}

/// How the fake process behaves when signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Nothing is running.
    Idle,
    /// Exits on the interrupt signal.
    ExitsOnInterrupt,
    /// Survives every signal.
    Stubborn,
}

/// Process table with a single instance matching the AppImage name.
pub struct FakeProbe {
    pub pid: u32,
    behaviour: Behaviour,
    alive: Cell<bool>,
    pub signals: RefCell<Vec<(u32, SignalKind)>>,
}

impl FakeProbe {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            pid: 4242,
            behaviour,
            alive: Cell::new(behaviour != Behaviour::Idle),
            signals: RefCell::new(Vec::new()),
        }
    }

    pub fn kinds(&self) -> Vec<SignalKind> {
        self.signals.borrow().iter().map(|(_, kind)| *kind).collect()
    }
}

impl ProcessProbe for FakeProbe {
    fn list_matching(&self, pattern: &str) -> Vec<u32> {
        if self.alive.get() && pattern == "cursor.AppImage" {
            vec![self.pid]
        } else {
            Vec::new()
        }
    }

    fn signal(&self, pid: u32, kind: SignalKind) -> Result<()> {
        self.signals.borrow_mut().push((pid, kind));
        if self.behaviour == Behaviour::ExitsOnInterrupt {
            self.alive.set(false);
        }
        Ok(())
    }
}

/// Config with every Linux path under `root` and no waiting.
pub fn linux_config(root: &Path) -> InstallerConfig {
    InstallerConfig::default()
        .with_linux_paths(LinuxPaths::under(root))
        .with_termination(TerminationPolicy::immediate())
        .with_manage_fuse(false)
}

/// Writes `bytes` as the currently installed AppImage.
pub fn seed_live(config: &InstallerConfig, bytes: &[u8]) {
    let live = &config.linux.appimage;
    fs::create_dir_all(live.parent().unwrap()).unwrap();
    fs::write(live, bytes).unwrap();
}
