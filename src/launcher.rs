//! Runtime process launch
//!
//! The runtime is started once with inherited stdio and the launcher blocks
//! until it exits. Caller arguments are appended verbatim after the fixed
//! invocation arguments.

use crate::config::LauncherConfig;
use crate::discovery::ExecutableLocation;
use crate::location::InstallLocation;
use crate::{PackError, PackResult};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

/// Everything needed to start the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Runtime executable
    pub executable: PathBuf,
    /// Working directory of the child process
    pub working_dir: PathBuf,
    /// Runtime arguments, invocation flag and payload path
    pub fixed_args: Vec<OsString>,
    /// Caller-supplied arguments, forwarded unchanged
    pub forwarded_args: Vec<OsString>,
}

impl LaunchSpec {
    /// Build the launch spec for an extracted bundle
    pub fn new(
        location: &InstallLocation,
        config: &LauncherConfig,
        executable: &ExecutableLocation,
        forwarded_args: Vec<OsString>,
    ) -> Self {
        let executable_path = executable
            .relative_path
            .split('/')
            .fold(location.runtime_dir(&config.runtime_dir), |path, segment| {
                path.join(segment)
            });

        let mut fixed_args: Vec<OsString> =
            config.runtime_args.iter().map(OsString::from).collect();
        fixed_args.push(executable.executable.invocation_flag().into());
        fixed_args.push(location.file_path(&config.payload_name).into_os_string());

        Self {
            executable: executable_path,
            working_dir: location.root().to_path_buf(),
            fixed_args,
            forwarded_args,
        }
    }

    /// Full argument vector passed to the runtime
    pub fn args(&self) -> impl Iterator<Item = &OsString> {
        self.fixed_args.iter().chain(self.forwarded_args.iter())
    }

    /// Build the command without running it
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command.current_dir(&self.working_dir).args(self.args());
        command
    }
}

/// Run the runtime and wait for it to exit
pub fn run(spec: &LaunchSpec) -> PackResult<ExitStatus> {
    tracing::info!(
        "Launching: {} {:?}",
        spec.executable.display(),
        spec.args().collect::<Vec<_>>()
    );

    let status = spec
        .command()
        .status()
        .map_err(|source| PackError::LaunchFailed {
            executable: spec.executable.clone(),
            source,
        })?;

    tracing::debug!("Runtime exited with {}", status);

    if !status.success() {
        return Err(PackError::ChildProcessFailed { status });
    }
    Ok(status)
}

/// Map a child exit status onto this process's exit code
pub fn exit_code(status: &ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return (code & 0xff) as u8;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (128 + signal).clamp(0, 255) as u8;
        }
    }

    1
}
