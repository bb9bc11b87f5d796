//! # Process Invocation
//!
//! Every external tool (gpg, gocryptfs, fusermount, cppcryptfs) is launched
//! through [`ProcessInvoker`]. Callers describe the invocation with a
//! [`CommandSpec`]; the invoker attaches stdin, captures stderr (and stdout
//! when asked), waits, and turns a non-zero exit into
//! [`CryptfsError::ExternalTool`] carrying the captured stderr verbatim.
//!
//! The only place two processes run at once is [`ProcessInvoker::run_pipeline`],
//! which connects a producer's stdout to a consumer's stdin through an OS pipe.
//! The consumer is always spawned first so the producer never blocks on a
//! pipe nobody is draining.

use crate::error::{CryptfsError, Result};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;
use zeroize::Zeroizing;

const REDACTED: &str = "<redacted>";

/// Where the child's standard input comes from.
#[derive(Debug, Default)]
pub enum StdinSource {
    /// No input; reads see end-of-file immediately.
    #[default]
    Null,
    /// Share the caller's standard input.
    Inherit,
    /// Write this buffer to the child, then close the pipe.
    Bytes(Zeroizing<Vec<u8>>),
}

#[derive(Clone)]
struct Arg {
    value: OsString,
    shown: Option<String>,
}

/// A fully described external invocation: program, ordered arguments and
/// optional stdin payload.
pub struct CommandSpec {
    program: OsString,
    args: Vec<Arg>,
    stdin: StdinSource,
    capture_stdout: bool,
}

impl CommandSpec {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            stdin: StdinSource::Null,
            capture_stdout: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(Arg {
            value: arg.as_ref().to_os_string(),
            shown: None,
        });
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Append `prefix` followed by a secret. Logs and error messages show the
    /// prefix only.
    pub fn secret_arg(mut self, prefix: &str, secret: &str) -> Self {
        self.args.push(Arg {
            value: OsString::from(format!("{prefix}{secret}")),
            shown: Some(format!("{prefix}{REDACTED}")),
        });
        self
    }

    pub fn stdin(mut self, source: StdinSource) -> Self {
        self.stdin = source;
        self
    }

    pub fn stdin_bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin(StdinSource::Bytes(Zeroizing::new(bytes.into())))
    }

    /// Keep the child's stdout instead of discarding it.
    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Argument values exactly as they will be passed to the child.
    pub fn arg_values(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(|arg| arg.value.as_os_str())
    }

    pub fn stdin_source(&self) -> &StdinSource {
        &self.stdin
    }

    pub fn captures_stdout(&self) -> bool {
        self.capture_stdout
    }

    /// Human-readable command line with secret arguments redacted.
    pub fn display(&self) -> String {
        let mut out = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            out.push(' ');
            match &arg.shown {
                Some(shown) => out.push_str(shown),
                None => out.push_str(&arg.value.to_string_lossy()),
            }
        }
        out
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Reject specs that can never be spawned.
    pub fn validate(&self) -> Result<()> {
        if self.program.is_empty() {
            return Err(CryptfsError::InvalidInput(
                "command has an empty program name".into(),
            ));
        }
        if self
            .args
            .iter()
            .any(|arg| arg.value.as_encoded_bytes().contains(&0))
        {
            return Err(CryptfsError::InvalidInput(format!(
                "argument for `{}` contains a NUL byte",
                self.program_name()
            )));
        }
        Ok(())
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(|arg| &arg.value));
        cmd
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stdin = match &self.stdin {
            StdinSource::Null => "null",
            StdinSource::Inherit => "inherit",
            StdinSource::Bytes(_) => "bytes",
        };
        f.debug_struct("CommandSpec")
            .field("command", &self.display())
            .field("stdin", &stdin)
            .field("capture_stdout", &self.capture_stdout)
            .finish()
    }
}

/// Result of a successful invocation.
#[derive(Debug, Default)]
pub struct ProcessOutput {
    /// Empty unless the spec asked for stdout capture.
    pub stdout: Zeroizing<Vec<u8>>,
    pub stderr: String,
}

/// Runs [`CommandSpec`]s to completion, optionally bounded by a timeout.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        spec.validate()?;
        debug!(command = %spec.display(), "running external command");

        let deadline = self.deadline();
        let mut cmd = spec.to_command();
        cmd.stderr(Stdio::piped());
        cmd.stdout(if spec.capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        match &spec.stdin {
            StdinSource::Null => cmd.stdin(Stdio::null()),
            StdinSource::Inherit => cmd.stdin(Stdio::inherit()),
            StdinSource::Bytes(_) => cmd.stdin(Stdio::piped()),
        };

        let mut child = cmd.spawn().map_err(|source| CryptfsError::Spawn {
            program: spec.program_name(),
            source,
        })?;

        let stdout_handle = spawn_reader(child.stdout.take());
        let stderr_handle = spawn_reader(child.stderr.take());

        let writer = match (&spec.stdin, child.stdin.take()) {
            (StdinSource::Bytes(payload), Some(stdin)) => Some(spawn_writer(stdin, payload)),
            _ => None,
        };

        let status = self.wait(&mut child, spec, deadline);
        let written = join_writer(writer);
        let stdout = join_reader(stdout_handle)?;
        let stderr = String::from_utf8_lossy(&join_reader(stderr_handle)?).into_owned();
        let status = status?;
        written?;

        check_status(spec, status, &stderr)?;
        Ok(ProcessOutput { stdout, stderr })
    }

    /// Run `producer | consumer`. Both processes are waited on before this
    /// returns, whatever the outcome. A consumer that exits non-zero is
    /// reported ahead of the producer, which usually only died of the broken
    /// pipe the consumer left behind.
    pub fn run_pipeline(&self, producer: &CommandSpec, consumer: &CommandSpec) -> Result<()> {
        producer.validate()?;
        consumer.validate()?;
        debug!(
            producer = %producer.display(),
            consumer = %consumer.display(),
            "running pipeline"
        );

        let deadline = self.deadline();
        let (reader, writer) = io::pipe()?;

        // Each Command is dropped right after spawning so the parent holds no
        // copy of either pipe end; otherwise the consumer never sees EOF.
        let mut consumer_child = {
            let mut cmd = consumer.to_command();
            cmd.stdin(Stdio::from(reader))
                .stdout(Stdio::null())
                .stderr(Stdio::piped());
            cmd.spawn().map_err(|source| CryptfsError::Spawn {
                program: consumer.program_name(),
                source,
            })?
        };
        let consumer_stderr = spawn_reader(consumer_child.stderr.take());

        let producer_spawn = {
            let mut cmd = producer.to_command();
            cmd.stdin(Stdio::null())
                .stdout(Stdio::from(writer))
                .stderr(Stdio::piped());
            cmd.spawn()
        };

        let producer_result = match producer_spawn {
            Ok(mut producer_child) => {
                let producer_stderr = spawn_reader(producer_child.stderr.take());
                let status = self.wait(&mut producer_child, producer, deadline);
                let stderr = join_reader(producer_stderr)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
                match (status, stderr) {
                    (Ok(status), Ok(stderr)) => check_status(producer, status, &stderr),
                    (Err(err), _) | (_, Err(err)) => Err(err),
                }
            }
            Err(source) => Err(CryptfsError::Spawn {
                program: producer.program_name(),
                source,
            }),
        };

        let consumer_status = self.wait(&mut consumer_child, consumer, deadline);
        let consumer_stderr =
            String::from_utf8_lossy(&join_reader(consumer_stderr)?).into_owned();

        let consumer_result = consumer_status
            .and_then(|status| check_status(consumer, status, &consumer_stderr));
        if let Err(err @ CryptfsError::ExternalTool { .. }) = consumer_result {
            return Err(err);
        }
        producer_result?;
        consumer_result
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }

    fn wait(
        &self,
        child: &mut Child,
        spec: &CommandSpec,
        deadline: Option<Instant>,
    ) -> Result<ExitStatus> {
        let Some(deadline) = deadline else {
            return Ok(child.wait()?);
        };

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CryptfsError::Timeout {
                    program: spec.program_name(),
                    timeout: self.timeout.unwrap_or_default(),
                });
            }
            thread::sleep(Duration::from_millis(25));
        }
    }
}

/// Feed `payload` from a thread so a child that never reads its input cannot
/// stall the deadline loop.
fn spawn_writer(mut stdin: ChildStdin, payload: &[u8]) -> JoinHandle<Result<()>> {
    let payload = Zeroizing::new(payload.to_vec());
    thread::spawn(move || write_payload(&mut stdin, &payload))
}

fn join_writer(handle: Option<JoinHandle<Result<()>>>) -> Result<()> {
    match handle {
        None => Ok(()),
        Some(handle) => handle.join().map_err(|_| {
            CryptfsError::Io(io::Error::other("input writer thread panicked"))
        })?,
    }
}

fn write_payload(stdin: &mut impl Write, payload: &[u8]) -> Result<()> {
    // A child that exits without reading its input is judged by its exit
    // status, not by the broken pipe.
    match stdin.write_all(payload).and_then(|()| stdin.flush()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn check_status(spec: &CommandSpec, status: ExitStatus, stderr: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    Err(CryptfsError::ExternalTool {
        program: spec.program_name(),
        command: spec.display(),
        status: status.to_string(),
        stderr: stderr.to_string(),
    })
}

type ReaderHandle = Option<JoinHandle<io::Result<Vec<u8>>>>;

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> ReaderHandle {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_reader(handle: ReaderHandle) -> Result<Zeroizing<Vec<u8>>> {
    match handle {
        None => Ok(Zeroizing::new(Vec::new())),
        Some(handle) => {
            let bytes = handle.join().map_err(|_| {
                CryptfsError::Io(io::Error::other("output reader thread panicked"))
            })??;
            Ok(Zeroizing::new(bytes))
        }
    }
}
