//! # Lifecycle Dispatch
//!
//! [`BackendDispatcher`] drives `create`, `mount` and `umount` for one
//! platform strategy. Each operation checks the repository layout first, so a
//! malformed repository never reaches gpg or the backend.
//!
//! A failed `create` stops at the failing step and leaves whatever was already
//! written (root, `objects/`, possibly `passphrase.gpg`) in place. Nothing is
//! rolled back; remove the directory before retrying.

use crate::backend::{
    MountOptions, PassphraseDelivery, PassphraseInput, Platform, PlatformStrategy,
};
use crate::config::Settings;
use crate::error::Result;
use crate::mount_point::{self, MountTarget};
use crate::passphrase::{check_recipient, Gpg, PassphraseManager};
use crate::process::{CommandSpec, ProcessInvoker};
use crate::repo::{Operation, RepoState, Repository};
use tracing::info;

pub struct BackendDispatcher {
    strategy: Box<dyn PlatformStrategy>,
    passphrases: PassphraseManager,
    invoker: ProcessInvoker,
}

impl BackendDispatcher {
    pub fn new(
        strategy: Box<dyn PlatformStrategy>,
        passphrases: PassphraseManager,
        invoker: ProcessInvoker,
    ) -> Self {
        Self {
            strategy,
            passphrases,
            invoker,
        }
    }

    pub fn from_settings(settings: &Settings, platform: Platform) -> Self {
        let invoker = settings.invoker();
        Self::new(
            platform.strategy(settings),
            PassphraseManager::new(Gpg::from_settings(settings), invoker.clone()),
            invoker,
        )
    }

    pub fn platform(&self) -> Platform {
        self.strategy.platform()
    }

    pub fn backend_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Build the init command for `repo`.
    pub fn init(&self, repo: &Repository) -> Result<CommandSpec> {
        self.with_passphrase(repo, |input| self.strategy.init(repo, input))
    }

    /// Build the mount command for `repo` at an already resolved target.
    pub fn mount_command(
        &self,
        repo: &Repository,
        target: &MountTarget,
        options: &MountOptions,
    ) -> Result<CommandSpec> {
        self.with_passphrase(repo, |input| {
            self.strategy.mount(repo, target, options, input)
        })
    }

    pub fn unmount_command(&self, target: &MountTarget) -> Result<CommandSpec> {
        self.strategy.unmount(target)
    }

    /// Uninitialized -> Initialized.
    pub fn create(&self, recipient: &str, repo: &Repository) -> Result<RepoState> {
        check_recipient(recipient)?;
        repo.validate_for_create()?;
        let state = RepoState::Uninitialized.transition(Operation::Create)?;

        repo.materialize()?;

        println!("Generating and encrypting passphrase with GPG...");
        self.passphrases
            .generate_encrypted(recipient, &repo.passphrase_file())?;

        info!(backend = self.backend_name(), "initializing backend");
        self.invoker.run(&self.init(repo)?)?;
        self.strategy.finish_init(repo)?;

        Ok(state)
    }

    /// Initialized/Unmounted -> Mounted. Returns the resolved target.
    pub fn mount(
        &self,
        repo: &Repository,
        target: &str,
        options: &MountOptions,
    ) -> Result<MountTarget> {
        repo.validate_for_mount()?;
        repo.probe_state().transition(Operation::Mount)?;

        let target = mount_point::resolve(target, self.platform())?;
        info!(backend = self.backend_name(), target = %target, "mounting");
        self.invoker
            .run(&self.mount_command(repo, &target, options)?)?;
        Ok(target)
    }

    /// Mounted -> Unmounted. Returns the target that was unmounted.
    pub fn umount(&self, target: &str) -> Result<MountTarget> {
        let target = mount_point::classify(target, self.platform())?;
        info!(backend = self.backend_name(), target = %target, "unmounting");
        self.invoker.run(&self.unmount_command(&target)?)?;
        Ok(target)
    }

    /// Hand the strategy the passphrase the way it wants it. A decrypted
    /// passphrase lives only for the duration of `f`.
    fn with_passphrase<T>(
        &self,
        repo: &Repository,
        f: impl FnOnce(&PassphraseInput<'_>) -> Result<T>,
    ) -> Result<T> {
        match self.strategy.deliver_passphrase() {
            PassphraseDelivery::ExternalCommand => {
                let argv = self.passphrases.gpg().decrypt_argv(&repo.passphrase_file());
                f(&PassphraseInput::Hook(argv))
            }
            PassphraseDelivery::InProcess => {
                println!("Decrypting passphrase...");
                let passphrase = self.passphrases.decrypt(&repo.passphrase_file())?;
                f(&PassphraseInput::Plain(&passphrase))
            }
        }
    }
}
