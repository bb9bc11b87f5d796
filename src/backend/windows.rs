use super::{MountOptions, PassphraseDelivery, PassphraseInput, Platform, PlatformStrategy};
use crate::config::Settings;
use crate::error::{CryptfsError, Result};
use crate::fsutil;
use crate::mount_point::MountTarget;
use crate::passphrase::Passphrase;
use crate::process::CommandSpec;
use crate::repo::{Repository, CONFIG_FILE};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use tracing::warn;

const DEFAULT_VOLUME_NAME: &str = "cryptfs";

/// cppcryptfs, with cppcryptfsctl for initialization.
///
/// cppcryptfs has no command hook for the passphrase, so it is decrypted in
/// this process: written to `cppcryptfsctl`'s stdin on init, and passed as
/// `--password=` on mount. The latter is visible in the process table while
/// the mount command runs.
#[derive(Debug, Clone)]
pub struct Cppcryptfs {
    program: String,
    ctl_program: String,
}

impl Cppcryptfs {
    pub fn new(program: impl Into<String>, ctl_program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ctl_program: ctl_program.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.cppcryptfs_program.clone(),
            settings.cppcryptfsctl_program.clone(),
        )
    }
}

fn flag(name: &str, value: impl AsRef<OsStr>) -> OsString {
    let mut flag = OsString::from(name);
    flag.push(value);
    flag
}

fn plain<'a>(passphrase: &PassphraseInput<'a>) -> Result<&'a Passphrase> {
    match passphrase {
        PassphraseInput::Plain(passphrase) => Ok(*passphrase),
        PassphraseInput::Hook(_) => Err(CryptfsError::InvalidInput(
            "cppcryptfs needs the decrypted passphrase".into(),
        )),
    }
}

impl PlatformStrategy for Cppcryptfs {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    fn name(&self) -> &'static str {
        "cppcryptfs"
    }

    fn deliver_passphrase(&self) -> PassphraseDelivery {
        PassphraseDelivery::InProcess
    }

    fn init(&self, repo: &Repository, passphrase: &PassphraseInput<'_>) -> Result<CommandSpec> {
        let passphrase = plain(passphrase)?.backend_str()?;
        let volume_name = repo.name().unwrap_or(DEFAULT_VOLUME_NAME);

        Ok(CommandSpec::new(&self.ctl_program)
            .arg(flag("--init=", repo.objects_dir()))
            .arg(flag("--volumename=", volume_name))
            .arg("--deterministicnames")
            .stdin_bytes(passphrase.as_bytes().to_vec()))
    }

    /// cppcryptfsctl writes its config inside the ciphertext directory.
    fn finish_init(&self, repo: &Repository) -> Result<()> {
        let emitted = repo.objects_dir().join(CONFIG_FILE);
        let config = repo.config_file();
        fs::rename(&emitted, &config).map_err(|err| {
            CryptfsError::Io(io::Error::new(
                err.kind(),
                format!(
                    "failed to move {CONFIG_FILE} from '{}' to '{}': {err}",
                    emitted.display(),
                    config.display()
                ),
            ))
        })?;
        fsutil::restrict_file(&config)
    }

    fn mount(
        &self,
        repo: &Repository,
        target: &MountTarget,
        options: &MountOptions,
        passphrase: &PassphraseInput<'_>,
    ) -> Result<CommandSpec> {
        let passphrase = plain(passphrase)?.backend_str()?;
        if let Some(opts) = options.joined() {
            warn!(options = %opts, "mount options are not supported by cppcryptfs; ignoring");
        }

        Ok(CommandSpec::new(&self.program)
            .arg(flag("--mount=", repo.objects_dir()))
            .arg(flag("--drive=", target.as_arg()))
            .secret_arg("--password=", passphrase)
            .arg(flag("--config=", repo.config_file()))
            .args(["-t", "-x"]))
    }

    fn unmount(&self, target: &MountTarget) -> Result<CommandSpec> {
        Ok(CommandSpec::new(&self.program).arg(flag("--unmount=", target.as_arg())))
    }
}
