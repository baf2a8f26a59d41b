//! Real host implementations: subprocesses and FQDN detection.

use super::{HostInfoOps, ProcessOps};
use crate::{BackendError, BackendResult};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

const HOSTNAME_TIMEOUT: Duration = Duration::from_secs(10);
const KERNEL_HOSTNAME: &str = "/proc/sys/kernel/hostname";

fn map_command_err(program: &str, err: std::io::Error) -> BackendError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return BackendError::CommandNotFound(program.to_string());
    }
    BackendError::Io(err)
}

fn output_failed(program: &str, output: &Output) -> BackendError {
    BackendError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn output_with_timeout(
    program: &str,
    cmd: &mut Command,
    timeout: Duration,
) -> BackendResult<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| map_command_err(program, e))?;
    // Pipes are drained off-thread so a chatty child cannot fill them and stall.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let Some(status) = child.wait_timeout(timeout)? else {
        log::warn!("{} still running after {}s; killing it", program, timeout.as_secs());
        let _ = child.kill();
        let _ = child.wait();
        return Err(BackendError::CommandTimeout {
            program: program.to_string(),
            timeout_secs: timeout.as_secs(),
        });
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

/// Runs real subprocesses.
#[derive(Debug, Clone, Default)]
pub struct SystemProcess;

impl SystemProcess {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessOps for SystemProcess {
    fn command_output(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> BackendResult<Output> {
        log::debug!("exec: {} {}", program, args.join(" "));
        let mut cmd = Command::new(program);
        cmd.args(args);
        output_with_timeout(program, &mut cmd, timeout)
    }

    fn command_status(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> BackendResult<()> {
        let output = self.command_output(program, args, timeout)?;
        if !output.status.success() {
            return Err(output_failed(program, &output));
        }
        Ok(())
    }
}

/// Detects the FQDN the way `facter fqdn` would on a provisioning server:
/// `hostname -f` first, the kernel hostname as a fallback.
#[derive(Debug, Clone)]
pub struct SystemHostInfo<P = SystemProcess> {
    process: P,
    kernel_hostname: PathBuf,
}

impl SystemHostInfo<SystemProcess> {
    pub fn new() -> Self {
        Self::with_process(SystemProcess::new())
    }
}

impl Default for SystemHostInfo<SystemProcess> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProcessOps> SystemHostInfo<P> {
    pub fn with_process(process: P) -> Self {
        Self {
            process,
            kernel_hostname: PathBuf::from(KERNEL_HOSTNAME),
        }
    }

    /// Point the fallback at a different file (tests).
    pub fn with_kernel_hostname(mut self, path: impl Into<PathBuf>) -> Self {
        self.kernel_hostname = path.into();
        self
    }

    fn from_hostname_cmd(&self) -> BackendResult<String> {
        let output = self
            .process
            .command_output("hostname", &["-f"], HOSTNAME_TIMEOUT)?;
        if !output.status.success() {
            return Err(output_failed("hostname", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl<P: ProcessOps> HostInfoOps for SystemHostInfo<P> {
    fn fqdn(&self) -> BackendResult<String> {
        match self.from_hostname_cmd() {
            Ok(name) if !name.is_empty() => return Ok(name),
            Ok(_) => log::warn!("`hostname -f` printed nothing; falling back to kernel hostname"),
            Err(err) => log::warn!("`hostname -f` failed ({err}); falling back to kernel hostname"),
        }
        let name = fs::read_to_string(&self.kernel_hostname)?.trim().to_string();
        if name.is_empty() {
            return Err(BackendError::Other(
                "unable to determine the host's FQDN".to_string(),
            ));
        }
        Ok(name)
    }
}

/// A fixed FQDN, e.g. from `--fqdn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHostInfo(pub String);

impl HostInfoOps for StaticHostInfo {
    fn fqdn(&self) -> BackendResult<String> {
        if self.0.trim().is_empty() {
            return Err(BackendError::Other("FQDN override is empty".to_string()));
        }
        Ok(self.0.trim().to_string())
    }
}
