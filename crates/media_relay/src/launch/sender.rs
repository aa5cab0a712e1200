//! Sender launcher: transcodes a file to H.264 and streams it to a loopback port

use super::Relay;
use crate::endpoint::{SourceFile, StreamEndpoint};
use crate::error::{exit_code, mirror_exit_code, LaunchError};
use crate::runtime::{EngineCommand, LaunchOptions, SupervisorError};
use std::fmt;
use std::path::Path;
use tokio::sync::watch;

/// How an attached engine run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Engine exited with code 0
    Completed,
    /// Engine was killed by a signal it did not expect
    EngineCrashed { signal: i32 },
    /// Engine exited with a non-zero code
    EngineExitedNonZero { code: i32 },
    /// The run was cancelled and the engine terminated
    Cancelled,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ExitOutcome::Completed)
    }

    /// Exit code mirroring the engine's own termination
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitOutcome::Completed => 0,
            ExitOutcome::EngineCrashed { signal } => 128 + signal,
            ExitOutcome::EngineExitedNonZero { code } => mirror_exit_code(*code),
            ExitOutcome::Cancelled => exit_code::CANCELLED,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Completed => write!(f, "completed"),
            ExitOutcome::EngineCrashed { signal } => {
                write!(f, "engine crashed with signal {}", signal)
            }
            ExitOutcome::EngineExitedNonZero { code } => {
                write!(f, "engine exited with code {}", code)
            }
            ExitOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl Relay {
    /// Resolved sender command, without launching it
    pub fn send_command(
        &self,
        path: impl AsRef<Path>,
        port: i64,
    ) -> Result<EngineCommand, LaunchError> {
        let (source, endpoint) = validate_sender(path.as_ref(), port)?;
        let command = self.profile.send_command(&source, &endpoint)?;
        Ok(self.supervisor.resolve(&command)?)
    }

    /// Transcode `path` and stream it to `127.0.0.1:<port>`, blocking until
    /// the engine finishes or `cancel` fires.
    ///
    /// Errors mean the engine never ran; anything the running engine does is
    /// reported as an [`ExitOutcome`].
    pub async fn start_sender(
        &self,
        path: impl AsRef<Path>,
        port: i64,
        cancel: Option<watch::Receiver<()>>,
    ) -> Result<ExitOutcome, LaunchError> {
        let (source, endpoint) = validate_sender(path.as_ref(), port)?;
        let command = self.profile.send_command(&source, &endpoint)?;

        let mut options = LaunchOptions::attached().with_output(self.output.clone());
        options.cancel = cancel;

        log::info!(
            "Streaming {} to {}",
            source.path().display(),
            endpoint
        );

        let outcome = match self.supervisor.launch(&command, options).await {
            Ok(_) => ExitOutcome::Completed,
            Err(SupervisorError::EngineCrashed { signal }) => ExitOutcome::EngineCrashed { signal },
            Err(SupervisorError::EngineExitedNonZero { code }) => {
                ExitOutcome::EngineExitedNonZero { code }
            }
            Err(SupervisorError::Cancelled) => ExitOutcome::Cancelled,
            Err(e) => return Err(e.into()),
        };

        log::info!("Sender finished: {}", outcome);
        Ok(outcome)
    }
}

/// The port is checked before the file so a bad port is reported whatever
/// the path
fn validate_sender(path: &Path, port: i64) -> Result<(SourceFile, StreamEndpoint), LaunchError> {
    let endpoint = StreamEndpoint::new(port)?;
    let source = SourceFile::open(path)?;
    Ok((source, endpoint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineProfile;
    use crate::endpoint::EndpointError;
    use crate::engine::FixedLocator;
    use crate::runtime::Supervisor;

    fn relay() -> Relay {
        Relay::new(
            Supervisor::new(FixedLocator::new("/nonexistent/engine")),
            EngineProfile::default(),
        )
    }

    #[test]
    fn test_outcome_success_flag() {
        assert!(ExitOutcome::Completed.success());
        assert!(!ExitOutcome::EngineExitedNonZero { code: 1 }.success());
        assert!(!ExitOutcome::EngineCrashed { signal: 9 }.success());
        assert!(!ExitOutcome::Cancelled.success());
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(ExitOutcome::Completed.exit_code(), 0);
        assert_eq!(ExitOutcome::EngineExitedNonZero { code: 2 }.exit_code(), 2);
        assert_eq!(ExitOutcome::EngineCrashed { signal: 11 }.exit_code(), 139);
        assert_eq!(ExitOutcome::Cancelled.exit_code(), 130);
    }

    #[tokio::test]
    async fn test_invalid_port_wins_over_missing_file() {
        let result = relay().start_sender("/nonexistent/clip.ts", 0, None).await;
        assert!(matches!(
            result,
            Err(LaunchError::Validation(EndpointError::InvalidPort(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = relay().start_sender("/nonexistent/clip.ts", 5004, None).await;
        assert!(matches!(
            result,
            Err(LaunchError::Validation(EndpointError::FileNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_engine_is_an_error_not_an_outcome() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = relay().start_sender(file.path(), 5004, None).await;
        assert!(matches!(
            result,
            Err(LaunchError::Supervisor(SupervisorError::EngineNotFound(_)))
        ));
    }
}
