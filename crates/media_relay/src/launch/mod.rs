//! Receiver and sender launchers on top of the supervisor

mod receiver;
mod sender;

pub use receiver::*;
pub use sender::*;

use crate::config::{EngineProfile, RelayConfig};
use crate::engine::EngineLocator;
use crate::runtime::{OutputMode, Supervisor};

/// Builds engine commands from a profile and hands them to the supervisor
#[derive(Clone)]
pub struct Relay {
    supervisor: Supervisor,
    profile: EngineProfile,
    output: OutputMode,
}

impl Relay {
    pub fn new(supervisor: Supervisor, profile: EngineProfile) -> Self {
        Self {
            supervisor,
            profile,
            output: OutputMode::Discard,
        }
    }

    /// Relay for a loaded configuration, resolving the engine with `locator`
    pub fn from_config(config: &RelayConfig, locator: impl EngineLocator + 'static) -> Self {
        let supervisor = Supervisor::new(locator).with_stop_timeout(config.stop_timeout());
        Self::new(supervisor, config.engine.clone())
    }

    /// Capture engine output instead of discarding it
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }
}
