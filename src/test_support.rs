//! Fake external tools for unit tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Stand-in for gpg: "encrypts" by prefixing `FAKEGPG:` and "decrypts" by
/// stripping it. Recipient `nobody@example.com` has no public key.
pub const FAKE_GPG: &str = r#"#!/bin/sh
if [ "$1" = "--homedir" ]; then shift 2; fi
case "$1" in
  --gen-random)
    printf 'dGVzdC1wYXNzcGhyYXNlLWZyb20tZmFrZS1ncGctcm5nLTAxMjM0NTY3ODlhYmNkZWY=\n'
    ;;
  --encrypt)
    out=""
    while [ $# -gt 0 ]; do
      case "$1" in
        -r) recipient="$2" ;;
        -o) out="$2" ;;
      esac
      shift
    done
    if [ "$recipient" = "nobody@example.com" ]; then
      echo "gpg: nobody@example.com: skipped: No public key" >&2
      exit 2
    fi
    { printf 'FAKEGPG:'; cat; } > "$out"
    ;;
  --decrypt)
    if [ ! -f "$2" ]; then
      echo "gpg: can't open '$2': No such file or directory" >&2
      exit 2
    fi
    tail -c +9 "$2"
    ;;
  *)
    echo "fake gpg: unsupported arguments: $*" >&2
    exit 2
    ;;
esac
"#;

/// Write an executable script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Logs its arguments, checks that the `-extpass` hook yields a password and
/// writes the `--config` file on `-init`.
pub const FAKE_GOCRYPTFS: &str = r#"#!/bin/sh
dir=$(dirname "$0")
printf '%s\n' "$*" >> "$dir/gocryptfs.log"
init=0
config=""
extpass=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--config" ]; then config="$arg"; fi
  case "$arg" in
    -init) init=1 ;;
    -extpass=*) extpass="$extpass ${arg#-extpass=}" ;;
  esac
  prev="$arg"
done
if [ -z "$($extpass)" ]; then
  echo "fake gocryptfs: extpass produced no password" >&2
  exit 12
fi
if [ "$init" = 1 ]; then
  printf '{"Creator":"fake gocryptfs"}\n' > "$config"
fi
"#;

pub const FAKE_FUSERMOUNT: &str = r#"#!/bin/sh
echo "fusermount: entry for $2 not found in /etc/mtab" >&2
exit 1
"#;

/// Records stdin and emits its config inside the ciphertext directory, like
/// the real cppcryptfsctl.
pub const FAKE_CPPCRYPTFSCTL: &str = r#"#!/bin/sh
dir=$(dirname "$0")
printf '%s\n' "$*" >> "$dir/cppcryptfsctl.log"
cat > "$dir/cppcryptfsctl.stdin"
for arg in "$@"; do
  case "$arg" in --init=*) cipher="${arg#--init=}" ;; esac
done
printf '{"Creator":"fake cppcryptfs"}\n' > "$cipher/gocryptfs.conf"
"#;

pub const FAKE_CPPCRYPTFS: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "$(dirname "$0")/cppcryptfs.log"
"#;
