//! # Passphrase Management
//!
//! Each repository has one random passphrase, generated by gpg's RNG and
//! stored only as a gpg message signed and encrypted to the repository owner
//! (`passphrase.gpg`). The plaintext is never written to disk.
//!
//! At creation time the RNG output is piped straight into `gpg --encrypt`, so
//! the plaintext never passes through this process. Decryption into memory
//! happens only for backends that need the passphrase itself rather than a
//! command that produces it; see [`crate::backend::PassphraseDelivery`].

use crate::config::Settings;
use crate::error::{CryptfsError, Result};
use crate::fsutil;
use crate::process::{CommandSpec, ProcessInvoker};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;
use zeroize::Zeroizing;

/// Bytes of randomness requested from gpg.
pub const PASSPHRASE_BYTES: usize = 64;

/// In-memory passphrase, wiped on drop.
pub struct Passphrase(Zeroizing<Vec<u8>>);

impl Passphrase {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.backend_str().map(str::is_empty).unwrap_or(true)
    }

    /// The passphrase as a backend expects it: UTF-8 with the trailing
    /// newline of armored output removed.
    pub fn backend_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.0)
            .map(str::trim_end)
            .map_err(|_| CryptfsError::InvalidInput("passphrase is not valid UTF-8".into()))
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase(<{} bytes>)", self.0.len())
    }
}

/// Command-line contract of the gpg binary.
#[derive(Debug, Clone)]
pub struct Gpg {
    program: String,
    homedir: Option<PathBuf>,
}

impl Gpg {
    pub fn new(program: impl Into<String>, homedir: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            homedir,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.gpg_program.clone(), settings.gpg_homedir.clone())
    }

    fn base(&self) -> CommandSpec {
        let spec = CommandSpec::new(&self.program);
        match &self.homedir {
            Some(dir) => spec.arg("--homedir").arg(dir),
            None => spec,
        }
    }

    pub fn gen_random(&self) -> CommandSpec {
        self.base()
            .args(["--gen-random", "--armor", "0"])
            .arg(PASSPHRASE_BYTES.to_string())
    }

    pub fn encrypt_to(&self, recipient: &str, output: &Path) -> CommandSpec {
        self.base()
            .args(["--encrypt", "--sign", "-r", recipient, "-o"])
            .arg(output)
    }

    pub fn decrypt(&self, input: &Path) -> CommandSpec {
        self.base().arg("--decrypt").arg(input).capture_stdout()
    }

    /// Argument vector of a command that prints the plaintext passphrase,
    /// for backends that run it themselves.
    pub fn decrypt_argv(&self, input: &Path) -> Vec<OsString> {
        let mut argv = vec![OsString::from(&self.program)];
        if let Some(dir) = &self.homedir {
            argv.push("--homedir".into());
            argv.push(dir.into());
        }
        argv.push("--decrypt".into());
        argv.push(input.into());
        argv
    }
}

pub struct PassphraseManager {
    gpg: Gpg,
    invoker: ProcessInvoker,
}

impl PassphraseManager {
    pub fn new(gpg: Gpg, invoker: ProcessInvoker) -> Self {
        Self { gpg, invoker }
    }

    pub fn gpg(&self) -> &Gpg {
        &self.gpg
    }

    /// Ask gpg for a fresh armored random secret.
    pub fn generate(&self) -> Result<Passphrase> {
        let output = self.invoker.run(&self.gpg.gen_random().capture_stdout())?;
        Ok(Passphrase(output.stdout))
    }

    /// Encrypt `passphrase` to `recipient` into `output` and restrict the
    /// result to its owner.
    pub fn encrypt(&self, recipient: &str, passphrase: &Passphrase, output: &Path) -> Result<()> {
        check_recipient(recipient)?;
        let spec = self
            .gpg
            .encrypt_to(recipient, output)
            .stdin_bytes(passphrase.as_bytes().to_vec());
        self.invoker.run(&spec)?;
        fsutil::restrict_file(output)
    }

    /// Generate a passphrase and encrypt it to `recipient` without the
    /// plaintext entering this process: `gpg --gen-random | gpg --encrypt`.
    pub fn generate_encrypted(&self, recipient: &str, output: &Path) -> Result<()> {
        check_recipient(recipient)?;
        info!(recipient, output = %output.display(), "generating encrypted passphrase");
        self.invoker.run_pipeline(
            &self.gpg.gen_random(),
            &self.gpg.encrypt_to(recipient, output),
        )?;
        fsutil::restrict_file(output)
    }

    /// Decrypt a stored passphrase into memory.
    pub fn decrypt(&self, input: &Path) -> Result<Passphrase> {
        let output = self.invoker.run(&self.gpg.decrypt(input))?;
        let passphrase = Passphrase(output.stdout);
        if passphrase.is_empty() {
            return Err(CryptfsError::InvalidInput(format!(
                "decrypting '{}' produced an empty passphrase",
                input.display()
            )));
        }
        Ok(passphrase)
    }
}

pub(crate) fn check_recipient(recipient: &str) -> Result<()> {
    if recipient.trim().is_empty() {
        return Err(CryptfsError::InvalidInput(
            "GPG user/email is required (-u/--user)".into(),
        ));
    }
    Ok(())
}
