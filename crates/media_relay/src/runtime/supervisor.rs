//! Launching and awaiting the external media engine

use crate::engine::{EngineLocator, EngineNotFound};
use crate::runtime::process::{ChildProcess, ChildStatus, EngineCommand, OutputMode};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;

/// How a single launch behaves
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Return right after spawn instead of waiting for exit
    pub detach: bool,
    /// Engine output handling
    pub output: OutputMode,
    /// Cancels an attached launch when the sender fires
    pub cancel: Option<watch::Receiver<()>>,
}

impl LaunchOptions {
    /// Fire-and-forget launch
    pub fn detached() -> Self {
        Self {
            detach: true,
            ..Default::default()
        }
    }

    /// Launch and block until the engine exits
    pub fn attached() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<()>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Runs one engine command at a time and reports its outcome.
///
/// No retries: a failed invocation is surfaced to the caller as-is.
#[derive(Clone)]
pub struct Supervisor {
    locator: Arc<dyn EngineLocator>,
    stop_timeout: Duration,
}

impl Supervisor {
    pub fn new(locator: impl EngineLocator + 'static) -> Self {
        Self {
            locator: Arc::new(locator),
            stop_timeout: Duration::from_secs(5),
        }
    }

    /// Grace period between SIGTERM and SIGKILL
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Resolve the engine program to an executable path
    pub fn resolve(&self, command: &EngineCommand) -> Result<EngineCommand, SupervisorError> {
        let path = self.locator.locate(&command.program)?;
        Ok(EngineCommand::new(
            path.to_string_lossy().into_owned(),
            command.args.clone(),
        ))
    }

    /// Launch `command`.
    ///
    /// Detached launches return a running process. Attached launches return
    /// the finished process on exit code 0 and an error for any other end.
    pub async fn launch(
        &self,
        command: &EngineCommand,
        options: LaunchOptions,
    ) -> Result<ChildProcess, SupervisorError> {
        let LaunchOptions {
            detach,
            output,
            mut cancel,
        } = options;

        let mut process = self.spawn(command, output, detach)?;

        if detach {
            log::info!(
                "[{}] Engine detached: {}",
                process.pid(),
                process.command()
            );
            return Ok(process);
        }

        let cancelled = tokio::select! {
            _ = process.wait() => false,
            _ = cancellation(&mut cancel) => true,
        };

        if cancelled {
            log::info!("[{}] Cancellation requested", process.pid());
            process.terminate(self.stop_timeout).await;
            return Err(SupervisorError::Cancelled);
        }

        let status = process.status().clone();
        status_to_result(status)?;
        Ok(process)
    }

    fn spawn(
        &self,
        command: &EngineCommand,
        output: OutputMode,
        detach: bool,
    ) -> Result<ChildProcess, SupervisorError> {
        let resolved = self.resolve(command)?;

        log::info!("Starting engine: {}", resolved);

        let mut std_cmd = std::process::Command::new(&resolved.program);
        std_cmd.args(&resolved.args).stdin(Stdio::null());

        // Own process group: terminal signals reach the launcher only, which
        // forwards termination explicitly.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(!detach);

        let event_tx = match output {
            OutputMode::Discard => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
                None
            }
            OutputMode::Capture(tx) => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                Some(tx)
            }
        };

        let child = cmd.spawn().map_err(|e| {
            log::error!("Failed to spawn {}: {}", resolved.program, e);
            SupervisorError::SpawnFailed {
                program: resolved.program.clone(),
                source: e,
            }
        })?;

        let process = ChildProcess::new(child, resolved, event_tx);
        log::debug!("[{}] Engine started", process.pid());
        Ok(process)
    }
}

/// Map a terminal status to the supervisor's error taxonomy
pub fn status_to_result(status: ChildStatus) -> Result<(), SupervisorError> {
    match status {
        ChildStatus::Exited(0) => Ok(()),
        ChildStatus::Exited(code) => Err(SupervisorError::EngineExitedNonZero { code }),
        ChildStatus::Signaled(signal) => Err(SupervisorError::EngineCrashed { signal }),
        ChildStatus::Failed(reason) => Err(SupervisorError::WaitFailed(reason)),
        ChildStatus::Running => Err(SupervisorError::WaitFailed(
            "engine is still running".to_string(),
        )),
    }
}

/// Resolves once the cancel sender fires; never if there is none or it is dropped
pub(crate) async fn cancellation(cancel: &mut Option<watch::Receiver<()>>) {
    if let Some(rx) = cancel {
        if rx.changed().await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Errors that can occur while launching or awaiting the engine
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error(transparent)]
    EngineNotFound(#[from] EngineNotFound),

    #[error("Failed to spawn engine '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine crashed with signal {signal}")]
    EngineCrashed { signal: i32 },

    #[error("Engine exited with code {code}")]
    EngineExitedNonZero { code: i32 },

    #[error("Engine state unknown: {0}")]
    WaitFailed(String),

    #[error("Engine run cancelled")]
    Cancelled,
}
