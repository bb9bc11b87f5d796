use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_GPG: &str = r#"#!/bin/sh
if [ "$1" = "--homedir" ]; then shift 2; fi
case "$1" in
  --gen-random)
    printf 'aW50ZWdyYXRpb24tdGVzdC1wYXNzcGhyYXNlLTAxMjM0NTY3ODlhYmNkZWZnaGlqaw==\n'
    ;;
  --encrypt)
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
    tail -c +9 "$2"
    ;;
  *)
    exit 2
    ;;
esac
"#;

/// Mount targets are remembered in `mounts` next to the script.
const FAKE_GOCRYPTFS: &str = r#"#!/bin/sh
dir=$(dirname "$0")
printf '%s\n' "$*" >> "$dir/gocryptfs.log"
init=0
prev=""
for arg in "$@"; do
  if [ "$prev" = "--config" ]; then config="$arg"; fi
  case "$arg" in
    -init) init=1 ;;
    -extpass=*) extpass="$extpass ${arg#-extpass=}" ;;
  esac
  prev="$arg"
  last="$arg"
done
if [ -z "$($extpass)" ]; then
  echo "gocryptfs: extpass returned nothing" >&2
  exit 12
fi
if [ "$init" = 1 ]; then
  printf '{"Creator":"fake gocryptfs"}\n' > "$config"
else
  printf '%s\n' "$last" >> "$dir/mounts"
fi
"#;

const FAKE_FUSERMOUNT: &str = r#"#!/bin/sh
dir=$(dirname "$0")
if [ -f "$dir/mounts" ] && grep -qxF "$2" "$dir/mounts"; then
  grep -vxF "$2" "$dir/mounts" > "$dir/mounts.new"
  mv "$dir/mounts.new" "$dir/mounts"
  exit 0
fi
echo "fusermount: entry for $2 not found in /etc/mtab" >&2
exit 1
"#;

/// Temporary workspace with fake gpg/gocryptfs/fusermount on hand.
pub struct Sandbox {
    temp: TempDir,
}

#[allow(dead_code)]
impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sandbox = Self { temp };
        fs::create_dir_all(sandbox.bin()).unwrap();
        fs::create_dir_all(sandbox.home()).unwrap();
        sandbox.tool("gpg", FAKE_GPG);
        sandbox.tool("gocryptfs", FAKE_GOCRYPTFS);
        sandbox.tool("fusermount", FAKE_FUSERMOUNT);
        sandbox
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn bin(&self) -> PathBuf {
        self.temp.path().join("bin")
    }

    fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    fn tool(&self, name: &str, body: &str) {
        let path = self.bin().join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Contents of a log written by one of the fake tools.
    pub fn log(&self, name: &str) -> String {
        fs::read_to_string(self.bin().join(name)).unwrap_or_default()
    }

    /// The cryptfs-cli binary wired to the fake tools.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("cryptfs-cli");
        cmd.current_dir(self.path())
            .env_remove("CRYPTFS_CONFIG")
            .env_remove("RUST_LOG")
            .env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home())
            .env("CRYPTFS_GPG_PROGRAM", self.bin().join("gpg"))
            .env("CRYPTFS_GOCRYPTFS_PROGRAM", self.bin().join("gocryptfs"))
            .env("CRYPTFS_FUSERMOUNT_PROGRAM", self.bin().join("fusermount"));
        cmd
    }
}

pub fn mode_of(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}
