//! Receiver launcher: plays an RTP stream arriving on a loopback port

use super::Relay;
use crate::endpoint::StreamEndpoint;
use crate::error::LaunchError;
use crate::runtime::{
    status_to_result, ChildProcess, ChildStatus, EngineCommand, LaunchOptions, SupervisorError,
};
use std::time::Duration;

/// A detached receiver engine.
///
/// Dropping the handle leaves the engine running.
#[derive(Debug)]
pub struct ReceiverHandle {
    endpoint: StreamEndpoint,
    process: ChildProcess,
    stop_timeout: Duration,
}

impl ReceiverHandle {
    pub fn pid(&self) -> u32 {
        self.process.pid()
    }

    pub fn endpoint(&self) -> StreamEndpoint {
        self.endpoint
    }

    pub fn command(&self) -> &EngineCommand {
        self.process.command()
    }

    /// Poll the engine without blocking
    pub fn try_status(&mut self) -> ChildStatus {
        self.process.try_status()
    }

    /// Wait for the engine to exit; a failed bind shows up here as a
    /// non-zero exit
    pub async fn wait(&mut self) -> Result<(), SupervisorError> {
        status_to_result(self.process.wait().await)
    }

    /// Terminate the engine (SIGTERM, then SIGKILL after the stop timeout)
    pub async fn stop(&mut self) -> ChildStatus {
        log::info!("[{}] Stopping receiver on {}", self.pid(), self.endpoint);
        self.process.terminate(self.stop_timeout).await
    }

    /// Give up tracking; the engine keeps running. Returns its pid.
    pub fn release(self) -> u32 {
        self.process.release()
    }
}

impl Relay {
    /// Resolved receiver command for `port`, without launching it
    pub fn receive_command(&self, port: i64) -> Result<EngineCommand, LaunchError> {
        let endpoint = StreamEndpoint::new(port)?;
        let command = self.profile.receive_command(&endpoint)?;
        Ok(self.supervisor.resolve(&command)?)
    }

    /// Start playing the stream on `127.0.0.1:<port>` and return at once
    pub async fn start_receiver(&self, port: i64) -> Result<ReceiverHandle, LaunchError> {
        let endpoint = StreamEndpoint::new(port)?;
        let command = self.profile.receive_command(&endpoint)?;

        let options = LaunchOptions::detached().with_output(self.output.clone());
        let process = self.supervisor.launch(&command, options).await?;

        log::info!("[{}] Receiver listening on {}", process.pid(), endpoint);
        Ok(ReceiverHandle {
            endpoint,
            process,
            stop_timeout: self.supervisor.stop_timeout(),
        })
    }
}
