use super::{MountOptions, PassphraseDelivery, PassphraseInput, Platform, PlatformStrategy};
use crate::config::Settings;
use crate::error::{CryptfsError, Result};
use crate::fsutil;
use crate::mount_point::MountTarget;
use crate::process::CommandSpec;
use crate::repo::Repository;
use std::ffi::OsString;
use std::path::Path;

/// gocryptfs + fusermount.
#[derive(Debug, Clone)]
pub struct Gocryptfs {
    program: String,
    fusermount: String,
}

impl Gocryptfs {
    pub fn new(program: impl Into<String>, fusermount: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            fusermount: fusermount.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.gocryptfs_program.clone(),
            settings.fusermount_program.clone(),
        )
    }

    fn with_config(&self, spec: CommandSpec, repo: &Repository) -> CommandSpec {
        spec.arg("--config").arg(repo.config_file())
    }
}

/// One `-extpass=<arg>` per argv element. gocryptfs splits a single
/// `-extpass` value on spaces, which breaks paths containing them.
fn extpass_args(passphrase: &PassphraseInput<'_>) -> Result<Vec<OsString>> {
    match passphrase {
        PassphraseInput::Hook(argv) if !argv.is_empty() => Ok(argv
            .iter()
            .map(|arg| {
                let mut flag = OsString::from("-extpass=");
                flag.push(arg);
                flag
            })
            .collect()),
        PassphraseInput::Hook(_) => Err(CryptfsError::InvalidInput(
            "gocryptfs needs a non-empty passphrase command".into(),
        )),
        PassphraseInput::Plain(_) => Err(CryptfsError::InvalidInput(
            "gocryptfs takes the passphrase from a command, not in-process".into(),
        )),
    }
}

fn mount_path(target: &MountTarget) -> Result<&Path> {
    match target {
        MountTarget::AbsolutePath(path) => Ok(path),
        MountTarget::DriveLetter(letter) => Err(CryptfsError::InvalidInput(format!(
            "drive letter '{letter}' is not a valid mount point on this platform"
        ))),
    }
}

impl PlatformStrategy for Gocryptfs {
    fn platform(&self) -> Platform {
        Platform::Posix
    }

    fn name(&self) -> &'static str {
        "gocryptfs"
    }

    fn deliver_passphrase(&self) -> PassphraseDelivery {
        PassphraseDelivery::ExternalCommand
    }

    fn init(&self, repo: &Repository, passphrase: &PassphraseInput<'_>) -> Result<CommandSpec> {
        let spec = CommandSpec::new(&self.program).args(["-init", "--deterministic-names"]);
        Ok(self
            .with_config(spec, repo)
            .args(extpass_args(passphrase)?)
            .arg(repo.objects_dir()))
    }

    fn finish_init(&self, repo: &Repository) -> Result<()> {
        fsutil::restrict_file(&repo.config_file())
    }

    fn mount(
        &self,
        repo: &Repository,
        target: &MountTarget,
        options: &MountOptions,
        passphrase: &PassphraseInput<'_>,
    ) -> Result<CommandSpec> {
        let mount_path = mount_path(target)?;
        let mut spec = self
            .with_config(CommandSpec::new(&self.program), repo)
            .args(extpass_args(passphrase)?);
        if let Some(opts) = options.joined() {
            spec = spec.arg("-o").arg(opts);
        }
        Ok(spec.arg(repo.objects_dir()).arg(mount_path))
    }

    fn unmount(&self, target: &MountTarget) -> Result<CommandSpec> {
        Ok(CommandSpec::new(&self.fusermount)
            .arg("-u")
            .arg(mount_path(target)?))
    }
}
