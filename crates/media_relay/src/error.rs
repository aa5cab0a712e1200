//! Launcher error taxonomy and process exit codes

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::endpoint::EndpointError;
use crate::runtime::SupervisorError;
use std::fmt;

/// Reserved exit codes, following sysexits(3)
pub mod exit_code {
    pub const INVALID_PORT: i32 = 64;
    pub const SOURCE_FILE: i32 = 66;
    pub const ENGINE_NOT_FOUND: i32 = 69;
    pub const SPAWN_FAILED: i32 = 71;
    pub const IO: i32 = 74;
    pub const CONFIG: i32 = 78;
    /// 128 + SIGINT, as a shell reports an interrupted job
    pub const CANCELLED: i32 = 130;
}

/// Where a launch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Bad configuration file
    Config,
    /// Input rejected before anything was started
    Validation,
    /// The engine could not be started
    Spawn,
    /// The engine started and then failed
    Runtime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Validation => "validation",
            Stage::Spawn => "spawn",
            Stage::Runtime => "runtime",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the launchers and capture tools
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] EndpointError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

impl LaunchError {
    pub fn stage(&self) -> Stage {
        match self {
            LaunchError::Config(_) => Stage::Config,
            LaunchError::Validation(_) => Stage::Validation,
            LaunchError::Supervisor(
                SupervisorError::EngineNotFound(_) | SupervisorError::SpawnFailed { .. },
            ) => Stage::Spawn,
            LaunchError::Supervisor(_) => Stage::Runtime,
            LaunchError::Capture(CaptureError::Bind { .. }) => Stage::Spawn,
            LaunchError::Capture(_) => Stage::Runtime,
        }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::Config(_) => exit_code::CONFIG,
            LaunchError::Validation(EndpointError::InvalidPort(_)) => exit_code::INVALID_PORT,
            LaunchError::Validation(_) => exit_code::SOURCE_FILE,
            LaunchError::Supervisor(e) => supervisor_exit_code(e),
            LaunchError::Capture(_) => exit_code::IO,
        }
    }
}

fn supervisor_exit_code(error: &SupervisorError) -> i32 {
    match error {
        SupervisorError::EngineNotFound(_) => exit_code::ENGINE_NOT_FOUND,
        SupervisorError::SpawnFailed { .. } => exit_code::SPAWN_FAILED,
        SupervisorError::EngineCrashed { signal } => 128 + signal,
        SupervisorError::EngineExitedNonZero { code } => mirror_exit_code(*code),
        SupervisorError::WaitFailed(_) => exit_code::IO,
        SupervisorError::Cancelled => exit_code::CANCELLED,
    }
}

/// Clamp an engine exit code into the range a process can report
pub(crate) fn mirror_exit_code(code: i32) -> i32 {
    match code & 0xff {
        0 => 1,
        c => c,
    }
}
