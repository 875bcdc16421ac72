//! Child process management

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use tracing::debug;

use focus_host_api::{HostError, HostResult};

/// A child process leading its own process group
///
/// Browsers fork helpers, so signals go to the whole group.
pub struct ManagedProcess {
    pub child: Child,
    pub pid: u32,
    pub pgid: u32,
}

impl ManagedProcess {
    /// Spawn `argv` in a new session, inheriting the environment
    pub fn spawn(argv: &[String]) -> HostResult<Self> {
        let Some((program, args)) = argv.split_first() else {
            return Err(HostError::SpawnFailed("Empty argv".into()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // SAFETY: setsid is async-signal-safe and nothing else runs pre-exec
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::other)?;
                Ok(())
            });
        }

        let child = cmd
            .spawn()
            .map_err(|e| HostError::SpawnFailed(format!("Failed to spawn {}: {}", program, e)))?;

        let pid = child.id();
        let pgid = pid; // After setsid, pid == pgid

        debug!(pid = pid, pgid = pgid, program = %program, "Process spawned");

        Ok(Self { child, pid, pgid })
    }

    fn signal_group(&self, sig: Signal) -> HostResult<()> {
        let pgid = Pid::from_raw(-(self.pgid as i32)); // Negative for process group

        match signal::kill(pgid, sig) {
            Ok(()) => {
                debug!(pgid = self.pgid, signal = ?sig, "Signalled process group");
                Ok(())
            }
            // Already gone
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(HostError::Internal(format!("Failed to send {:?}: {}", sig, e))),
        }
    }

    /// Send SIGTERM to the process group
    pub fn terminate(&self) -> HostResult<()> {
        self.signal_group(Signal::SIGTERM)
    }

    /// Whether the process has exited, reaping it if so
    pub fn try_wait(&mut self) -> HostResult<Option<std::process::ExitStatus>> {
        self.child
            .try_wait()
            .map_err(|e| HostError::Internal(format!("Wait failed: {}", e)))
    }

    /// Whether the process (or a zombie of it) still exists
    pub fn is_alive(&self) -> bool {
        signal::kill(Pid::from_raw(self.pid as i32), None).is_ok()
    }
}
