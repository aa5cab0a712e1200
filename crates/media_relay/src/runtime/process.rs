//! Supervised engine child process

use std::fmt;
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

/// An engine invocation: program plus arguments passed verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Child process status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildStatus {
    /// Process is running
    Running,
    /// Process exited with a code
    Exited(i32),
    /// Process was terminated by a signal
    Signaled(i32),
    /// Process state could not be observed
    Failed(String),
}

impl ChildStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ChildStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_running()
    }

    /// Classify an OS exit status
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ChildStatus::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;

            if let Some(signal) = status.signal() {
                return ChildStatus::Signaled(signal);
            }
        }

        ChildStatus::Failed(format!("unrecognized exit status: {}", status))
    }
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildStatus::Running => write!(f, "running"),
            ChildStatus::Exited(code) => write!(f, "exited with code {}", code),
            ChildStatus::Signaled(signal) => write!(f, "killed by signal {}", signal),
            ChildStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Event emitted by a supervised process when its output is captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// Process started
    Started { pid: u32 },
    /// Process output line (stdout or stderr)
    Output { line: String, is_stderr: bool },
    /// Process reached a terminal status
    Exited { status: ChildStatus },
}

/// Where the engine's stdout and stderr go
#[derive(Debug, Clone, Default)]
pub enum OutputMode {
    /// Redirect both streams to the null device
    #[default]
    Discard,
    /// Forward every line to the given channel
    Capture(mpsc::UnboundedSender<ProcessEvent>),
}

/// A launched engine process.
///
/// Status moves from `Running` to a terminal value exactly once.
pub struct ChildProcess {
    pid: u32,
    command: EngineCommand,
    status: ChildStatus,
    started_at: Instant,
    child: Option<Child>,
    event_tx: Option<mpsc::UnboundedSender<ProcessEvent>>,
}

impl ChildProcess {
    pub(crate) fn new(
        mut child: Child,
        command: EngineCommand,
        event_tx: Option<mpsc::UnboundedSender<ProcessEvent>>,
    ) -> Self {
        let pid = child.id().unwrap_or(0);

        if let Some(tx) = &event_tx {
            let _ = tx.send(ProcessEvent::Started { pid });

            if let Some(stdout) = child.stdout.take() {
                forward_lines(stdout, false, tx.clone());
            }
            if let Some(stderr) = child.stderr.take() {
                forward_lines(stderr, true, tx.clone());
            }
        }

        Self {
            pid,
            command,
            status: ChildStatus::Running,
            started_at: Instant::now(),
            child: Some(child),
            event_tx,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// The command as spawned, with the resolved engine path
    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    pub fn status(&self) -> &ChildStatus {
        &self.status
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Record a terminal status. Returns false if one was already recorded.
    fn settle(&mut self, status: ChildStatus) -> bool {
        if self.status.is_terminal() || status.is_running() {
            return false;
        }

        log::debug!("[{}] Engine {}", self.pid, status);
        self.status = status.clone();
        self.child = None;

        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ProcessEvent::Exited { status });
        }
        true
    }

    /// Poll for exit without blocking
    pub fn try_status(&mut self) -> ChildStatus {
        if let Some(child) = &mut self.child {
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.settle(ChildStatus::from_exit_status(status));
                }
                Ok(None) => {}
                Err(e) => {
                    self.settle(ChildStatus::Failed(e.to_string()));
                }
            }
        }

        self.status.clone()
    }

    /// Wait until the process reaches a terminal status
    pub async fn wait(&mut self) -> ChildStatus {
        if let Some(child) = &mut self.child {
            let status = match child.wait().await {
                Ok(status) => ChildStatus::from_exit_status(status),
                Err(e) => ChildStatus::Failed(format!("Error waiting for process: {}", e)),
            };
            self.settle(status);
        }

        self.status.clone()
    }

    /// Stop the process gracefully (SIGTERM, then SIGKILL after timeout)
    pub async fn terminate(&mut self, timeout: Duration) -> ChildStatus {
        if self.child.is_none() {
            return self.status.clone();
        }

        log::info!("[{}] Stopping engine...", self.pid);

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Err(e) = kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM) {
                log::debug!("[{}] SIGTERM failed: {}", self.pid, e);
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(child) = &mut self.child {
                let _ = child.start_kill();
            }
        }

        if let Ok(status) = tokio::time::timeout(timeout, self.wait()).await {
            return status;
        }

        log::warn!(
            "[{}] Engine did not exit gracefully, forcing kill",
            self.pid
        );
        if let Some(child) = &mut self.child {
            if let Err(e) = child.start_kill() {
                log::error!("[{}] Failed to kill engine: {}", self.pid, e);
            }
        }
        self.wait().await
    }

    /// Stop tracking the process without touching it
    pub fn release(mut self) -> u32 {
        // Dropping a tokio Child does not kill it unless kill_on_drop was set.
        self.child.take();
        self.pid
    }
}

impl fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildProcess")
            .field("pid", &self.pid)
            .field("command", &self.command)
            .field("status", &self.status)
            .finish()
    }
}

fn forward_lines<R>(reader: R, is_stderr: bool, tx: mpsc::UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(ProcessEvent::Output { line, is_stderr }).is_err() {
                break;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(ChildStatus::Running.is_running());
        assert!(ChildStatus::Exited(0).is_terminal());
        assert!(ChildStatus::Signaled(9).is_terminal());
        assert!(ChildStatus::Failed("x".into()).is_terminal());
    }

    #[test]
    #[cfg(unix)]
    fn test_from_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        assert_eq!(
            ChildStatus::from_exit_status(ExitStatus::from_raw(0)),
            ChildStatus::Exited(0)
        );
        // wait(2) encoding: exit code in the high byte, signal in the low bits
        assert_eq!(
            ChildStatus::from_exit_status(ExitStatus::from_raw(3 << 8)),
            ChildStatus::Exited(3)
        );
        assert_eq!(
            ChildStatus::from_exit_status(ExitStatus::from_raw(15)),
            ChildStatus::Signaled(15)
        );
    }

    #[test]
    fn test_command_display_quotes_spaces() {
        let cmd = EngineCommand::new(
            "cvlc",
            vec!["-q".to_string(), "my clip.ts".to_string()],
        );
        assert_eq!(cmd.to_string(), r#"cvlc -q "my clip.ts""#);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_status_settles_once() {
        let child = tokio::process::Command::new("/bin/sh")
            .args(["-c", "exit 4"])
            .spawn()
            .unwrap();
        let mut process =
            ChildProcess::new(child, EngineCommand::new("/bin/sh", Vec::new()), None);

        assert_eq!(process.wait().await, ChildStatus::Exited(4));
        assert!(!process.settle(ChildStatus::Signaled(9)));
        assert_eq!(process.try_status(), ChildStatus::Exited(4));
        assert_eq!(process.status(), &ChildStatus::Exited(4));
    }
}
