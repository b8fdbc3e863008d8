//! Running the built test program with its expectation side channel.
//!
//! Besides stdout and stderr the child gets a third writable stream at
//! descriptor [`EXPECT_FD`]. Everything the program writes there is what it
//! claims its stdout should be. All three streams are drained by reader threads
//! while the child runs, so a chatty program cannot wedge on a full pipe.

use std::ffi::OsString;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
pub use arrowtest_contracts::EXPECT_FD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ExecCommand {
    pub fn direct(exe: &Path) -> Self {
        Self {
            program: exe.as_os_str().to_os_string(),
            args: Vec::new(),
        }
    }

    /// `wrapper` is prefixed to the invocation, e.g. `["qemu-arm"]` or
    /// `["valgrind", "--error-exitcode=4"]`. An empty wrapper runs `exe`
    /// directly.
    pub fn wrapped(wrapper: &[String], exe: &Path) -> Self {
        let Some((program, rest)) = wrapper.split_first() else {
            return Self::direct(exe);
        };
        let mut args: Vec<OsString> = rest.iter().map(OsString::from).collect();
        args.push(exe.as_os_str().to_os_string());
        Self {
            program: OsString::from(program),
            args,
        }
    }

    pub fn argv_lossy(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Everything collected from one run of the test program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Process exit code, or `128 + signal` when the child was killed.
    pub exit_status: i32,
    pub exit_signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes written to the expectation descriptor.
    pub expect: Vec<u8>,
}

/// Reads `reader` to EOF, keeping at most `cap` bytes. Anything past the cap
/// is still drained, so the writer never blocks, and the flag reports that
/// bytes were dropped.
pub fn read_to_end_capped<R: Read>(reader: R, cap: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let mut kept = reader.take(cap as u64);
    let mut buf = Vec::new();
    kept.read_to_end(&mut buf)?;
    let dropped = std::io::copy(&mut kept.into_inner(), &mut std::io::sink())?;
    Ok((buf, dropped > 0))
}

#[cfg(unix)]
mod side_channel {
    use std::io;
    use std::os::fd::{AsRawFd as _, FromRawFd as _, OwnedFd, RawFd};

    use super::EXPECT_FD;

    /// Creates the expectation pipe with both ends close-on-exec, so only the
    /// descriptor installed by [`install_in_child`] survives into the child.
    pub(super) fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
        let mut fds: [libc::c_int; 2] = [-1, -1];
        #[cfg(target_os = "linux")]
        let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
        #[cfg(not(target_os = "linux"))]
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: both descriptors were just returned by pipe and have no other owner.
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        #[cfg(not(target_os = "linux"))]
        {
            set_cloexec(read.as_raw_fd(), true)?;
            set_cloexec(write.as_raw_fd(), true)?;
        }
        Ok((read, write))
    }

    fn set_cloexec(fd: RawFd, on: bool) -> io::Result<()> {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            if flags < 0 {
                return Err(io::Error::last_os_error());
            }
            let flags = if on {
                flags | libc::FD_CLOEXEC
            } else {
                flags & !libc::FD_CLOEXEC
            };
            if libc::fcntl(fd, libc::F_SETFD, flags) < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    /// Runs between fork and exec: moves `write_fd` to [`EXPECT_FD`] and makes
    /// it inheritable. Only async-signal-safe calls are allowed here.
    pub(super) fn install_in_child(write_fd: RawFd) -> io::Result<()> {
        if write_fd == EXPECT_FD {
            // dup2 onto itself is a no-op and would leave close-on-exec set.
            return set_cloexec(write_fd, false);
        }
        if unsafe { libc::dup2(write_fd, EXPECT_FD) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub(super) fn raw(fd: &OwnedFd) -> RawFd {
        fd.as_raw_fd()
    }
}

/// Runs `cmd` to completion and collects its exit status, stdout, stderr and
/// expectation stream. Each stream is capped at `max_output_bytes`; exceeding
/// the cap is an error rather than a silent truncation.
#[cfg(unix)]
pub fn run_with_side_channel(cmd: &ExecCommand, max_output_bytes: usize) -> Result<ExecutionResult> {
    use std::os::unix::process::CommandExt as _;
    use std::os::unix::process::ExitStatusExt as _;

    let (expect_read, expect_write) =
        side_channel::pipe().context("create expectation pipe")?;

    tracing::debug!(argv = ?cmd.argv_lossy(), expect_fd = EXPECT_FD, "spawning test program");
    let mut child = {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let write_fd = side_channel::raw(&expect_write);
        // SAFETY: the hook only calls dup2/fcntl, which are async-signal-safe.
        unsafe {
            command.pre_exec(move || side_channel::install_in_child(write_fd));
        }

        command
            .spawn()
            .with_context(|| format!("spawn test program: {:?}", cmd.program))?
    };
    // The parent's copy of the write end must go, or the reader never sees EOF.
    drop(expect_write);

    let stdout = child.stdout.take().context("take stdout")?;
    let stderr = child.stderr.take().context("take stderr")?;
    let expect = std::fs::File::from(expect_read);

    let cap = max_output_bytes;
    let stdout_thread = std::thread::spawn(move || read_to_end_capped(stdout, cap));
    let stderr_thread = std::thread::spawn(move || read_to_end_capped(stderr, cap));
    let expect_thread = std::thread::spawn(move || read_to_end_capped(expect, cap));

    let status = child.wait().context("wait for test program")?;

    let mut streams = Vec::with_capacity(3);
    for (name, handle) in [
        ("stdout", stdout_thread),
        ("stderr", stderr_thread),
        ("expectation stream", expect_thread),
    ] {
        let (bytes, truncated) = handle
            .join()
            .map_err(|_| anyhow::anyhow!("{name} reader thread panicked"))?
            .with_context(|| format!("read {name} of test program"))?;
        if truncated {
            anyhow::bail!("test program {name} exceeded max_output_bytes={cap}");
        }
        streams.push(bytes);
    }
    let expect = streams.pop().unwrap_or_default();
    let stderr = streams.pop().unwrap_or_default();
    let stdout = streams.pop().unwrap_or_default();

    let exit_signal = status.signal();
    if let Some(signal) = exit_signal {
        tracing::warn!(signal, "test program was killed by a signal");
    }
    let exit_status = match status.code() {
        Some(code) => code,
        None => exit_signal.map(|s| 128 + s).unwrap_or(1),
    };

    tracing::debug!(
        exit_status,
        exit_signal = ?exit_signal,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        expect_bytes = expect.len(),
        "test program finished"
    );

    Ok(ExecutionResult {
        exit_status,
        exit_signal,
        stdout,
        stderr,
        expect,
    })
}

#[cfg(not(unix))]
pub fn run_with_side_channel(
    cmd: &ExecCommand,
    _max_output_bytes: usize,
) -> Result<ExecutionResult> {
    anyhow::bail!(
        "cannot run {:?}: the expectation descriptor requires a unix host",
        cmd.program
    )
}
