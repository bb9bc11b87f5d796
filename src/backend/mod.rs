//! # Backends
//!
//! One [`PlatformStrategy`] per operating system turns a repository, a mount
//! target and a passphrase source into backend command lines:
//!
//! - [`posix::Gocryptfs`]: `gocryptfs` for init/mount, `fusermount -u` to
//!   unmount. The passphrase is delivered as an `-extpass` hook that runs
//!   `gpg --decrypt` inside gocryptfs, so it never reaches this process.
//! - [`windows::Cppcryptfs`]: `cppcryptfsctl.exe` for init (passphrase on
//!   stdin) and `cppcryptfs.exe` for mount (passphrase as an argument) and
//!   unmount. The passphrase is decrypted here first.
//!
//! The strategy is picked once from the running OS by [`Platform::detect`].

pub mod posix;
pub mod windows;

use crate::config::Settings;
use crate::error::Result;
use crate::mount_point::MountTarget;
use crate::passphrase::Passphrase;
use crate::process::CommandSpec;
use crate::repo::Repository;
use std::ffi::OsString;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    pub fn strategy(self, settings: &Settings) -> Box<dyn PlatformStrategy> {
        match self {
            Platform::Posix => Box::new(posix::Gocryptfs::from_settings(settings)),
            Platform::Windows => Box::new(windows::Cppcryptfs::from_settings(settings)),
        }
    }
}

/// How a backend obtains the plaintext passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseDelivery {
    /// The backend runs a command that prints it.
    ExternalCommand,
    /// This process decrypts it and hands it over (stdin or argument).
    InProcess,
}

/// The passphrase in the form the active delivery strategy needs.
pub enum PassphraseInput<'a> {
    /// argv of a command printing the passphrase.
    Hook(Vec<OsString>),
    Plain(&'a Passphrase),
}

impl fmt::Debug for PassphraseInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassphraseInput::Hook(argv) => f.debug_tuple("Hook").field(argv).finish(),
            PassphraseInput::Plain(_) => f.write_str("Plain(<redacted>)"),
        }
    }
}

/// Free-form backend mount options, given on the command line as `a,b,c`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountOptions(Vec<String>);

impl MountOptions {
    pub fn parse(raw: Option<&str>) -> Self {
        let options = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|opt| !opt.is_empty())
            .map(String::from)
            .collect();
        Self(options)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn joined(&self) -> Option<String> {
        (!self.0.is_empty()).then(|| self.0.join(","))
    }
}

pub trait PlatformStrategy {
    fn platform(&self) -> Platform;

    /// Backend name for status messages.
    fn name(&self) -> &'static str;

    fn deliver_passphrase(&self) -> PassphraseDelivery;

    fn init(&self, repo: &Repository, passphrase: &PassphraseInput<'_>) -> Result<CommandSpec>;

    /// Post-init fixups: put the backend config at its canonical path and
    /// restrict it to the owner.
    fn finish_init(&self, repo: &Repository) -> Result<()>;

    fn mount(
        &self,
        repo: &Repository,
        target: &MountTarget,
        options: &MountOptions,
        passphrase: &PassphraseInput<'_>,
    ) -> Result<CommandSpec>;

    fn unmount(&self, target: &MountTarget) -> Result<CommandSpec>;
}
