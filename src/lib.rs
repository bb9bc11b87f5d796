//! # cryptfs-cli
//!
//! Create, mount and unmount encrypted repositories. Cryptography and the
//! filesystem itself are delegated to external tools:
//!
//! - **gpg** generates the repository passphrase and keeps it encrypted to the
//!   owner's key (`passphrase.gpg`)
//! - **gocryptfs** (Linux, macOS, BSD) or **cppcryptfs** (Windows) stores the
//!   ciphertext in `objects/` and mounts the plaintext view
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a repository whose passphrase only alice can decrypt
//! cryptfs-cli create -u alice@example.com ~/vaults/notes
//!
//! # Mount it (on Windows the mount point may be a drive letter such as X:)
//! cryptfs-cli mount -o allow_other ~/vaults/notes ~/mnt/notes
//!
//! # Unmount
//! cryptfs-cli umount ~/mnt/notes
//! ```
//!
//! ## Repository Layout
//!
//! ```text
//! notes/
//! ├── objects/         ciphertext, owner-only
//! ├── passphrase.gpg   signed + encrypted passphrase, 0600
//! └── gocryptfs.conf   backend config, 0600
//! ```
//!
//! ## Passphrase Delivery
//!
//! On POSIX systems gocryptfs is given an `-extpass` hook that runs
//! `gpg --decrypt passphrase.gpg` itself, so the plaintext passphrase never
//! enters this process. cppcryptfs has no such hook: the passphrase is
//! decrypted here, written to `cppcryptfsctl`'s stdin on create, and passed as
//! `--password=` on mount. While the mount command runs, that argument is
//! readable by other processes of the same user.
//!
//! ## Configuration
//!
//! Tool paths, an alternate gpg home directory and an optional timeout are
//! read from a TOML file and `CRYPTFS_*` environment variables; see
//! [`config::Settings`].
//!
//! ## Module Overview
//!
//! - [`process`] - Running external tools, stderr capture, the gpg pipeline
//! - [`passphrase`] - Passphrase generation, encryption and decryption via gpg
//! - [`repo`] - Repository layout, validation and lifecycle states
//! - [`mount_point`] - Mount target resolution (paths vs. drive letters)
//! - [`backend`] - gocryptfs and cppcryptfs command construction
//! - [`dispatcher`] - create/mount/umount orchestration
//! - [`config`] - Settings file and environment overrides
//! - [`error`] - Error types
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//!
//! # Including the round trip against a real gpg installation
//! cargo test -- --include-ignored
//! ```
//!
//! Unit and integration tests on Unix replace gpg, gocryptfs and fusermount
//! with small shell scripts, so no FUSE or keyring setup is needed.

pub mod backend;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fsutil;
pub mod mount_point;
pub mod passphrase;
pub mod process;
pub mod repo;

#[cfg(all(test, unix))]
mod test_support;

pub use backend::{MountOptions, Platform, PlatformStrategy};
pub use dispatcher::BackendDispatcher;
pub use error::{CryptfsError, Result};
pub use mount_point::MountTarget;
pub use passphrase::{Passphrase, PassphraseManager};
pub use process::{CommandSpec, ProcessInvoker};
pub use repo::{RepoState, Repository};
