//! Engine profile YAML schema and command construction

use crate::config::substitution::{referenced_args, SubstitutionContext, SubstitutionError};
use crate::endpoint::{SourceFile, StreamEndpoint, STREAM_TTL};
use crate::runtime::EngineCommand;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// External media engine invocation
    #[serde(default)]
    pub engine: EngineProfile,

    /// Grace period between SIGTERM and SIGKILL when stopping the engine
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_stop_timeout_ms() -> u64 {
    5000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            engine: EngineProfile::default(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

/// How to invoke the media engine for each launcher.
///
/// Templates may reference `$(arg host)`, `$(arg port)`, `$(arg ttl)` and,
/// for the sender only, `$(arg source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineProfile {
    /// Engine program, resolved on the search path
    pub program: String,

    /// Arguments for playing an incoming stream
    pub receive_args: Vec<String>,

    /// Arguments for transcoding a file and streaming it out
    pub send_args: Vec<String>,
}

impl Default for EngineProfile {
    /// VLC without an interface, in quiet mode
    fn default() -> Self {
        Self {
            program: "cvlc".to_string(),
            receive_args: vec![
                "-q".to_string(),
                "rtp://$(arg host):$(arg port)".to_string(),
            ],
            send_args: vec![
                "-q".to_string(),
                "$(arg source)".to_string(),
                "--sout".to_string(),
                concat!(
                    "#transcode{vcodec=h264}:",
                    "rtp{dst=$(arg host),port=$(arg port),mux=ts,ttl=$(arg ttl)}"
                )
                .to_string(),
            ],
        }
    }
}

impl EngineProfile {
    /// Command that plays the stream arriving on `endpoint`
    pub fn receive_command(&self, endpoint: &StreamEndpoint) -> Result<EngineCommand, ConfigError> {
        let ctx = endpoint_context(endpoint);
        self.build("receive_args", &self.receive_args, &ctx)
    }

    /// Command that transcodes `source` and streams it to `endpoint`
    pub fn send_command(
        &self,
        source: &SourceFile,
        endpoint: &StreamEndpoint,
    ) -> Result<EngineCommand, ConfigError> {
        let ctx = endpoint_context(endpoint)
            .with_arg("source", source.path().to_string_lossy().into_owned());
        self.build("send_args", &self.send_args, &ctx)
    }

    fn build(
        &self,
        field: &str,
        templates: &[String],
        ctx: &SubstitutionContext,
    ) -> Result<EngineCommand, ConfigError> {
        let args = templates
            .iter()
            .map(|t| ctx.substitute(t))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ConfigError::Substitution {
                field: field.to_string(),
                source,
            })?;

        Ok(EngineCommand::new(&self.program, args))
    }

    /// Check the program and every template pattern
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "engine.program must not be empty".to_string(),
            ));
        }

        for (field, templates) in [
            ("receive_args", &self.receive_args),
            ("send_args", &self.send_args),
        ] {
            for template in templates {
                let names =
                    referenced_args(template).map_err(|source| ConfigError::Substitution {
                        field: field.to_string(),
                        source,
                    })?;

                if field == "receive_args" && names.iter().any(|n| n == "source") {
                    return Err(ConfigError::Validation(
                        "engine.receive_args cannot reference $(arg source)".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn endpoint_context(endpoint: &StreamEndpoint) -> SubstitutionContext {
    SubstitutionContext::new()
        .with_arg("host", endpoint.host().to_string())
        .with_arg("port", endpoint.port().to_string())
        .with_arg("ttl", STREAM_TTL.to_string())
}

impl RelayConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = serde_yaml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise the built-in profile
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Errors that can occur when loading a relay configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid template in engine.{field}: {source}")]
    Substitution {
        field: String,
        #[source]
        source: SubstitutionError,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_receive_command() {
        let profile = EngineProfile::default();
        let endpoint = StreamEndpoint::new(5004).unwrap();

        let cmd = profile.receive_command(&endpoint).unwrap();
        assert_eq!(cmd.program, "cvlc");
        assert_eq!(cmd.args, vec!["-q", "rtp://127.0.0.1:5004"]);
    }

    #[test]
    fn test_default_send_command() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = SourceFile::open(file.path()).unwrap();
        let endpoint = StreamEndpoint::new(6000).unwrap();

        let cmd = EngineProfile::default()
            .send_command(&source, &endpoint)
            .unwrap();
        assert_eq!(cmd.args[0], "-q");
        assert_eq!(cmd.args[1], file.path().to_string_lossy());
        assert_eq!(cmd.args[2], "--sout");
        assert_eq!(
            cmd.args[3],
            "#transcode{vcodec=h264}:rtp{dst=127.0.0.1,port=6000,mux=ts,ttl=1}"
        );
    }

    #[test]
    fn test_parse_config_file() {
        let yaml = r#"
engine:
  program: ffplay
  receive_args: ["-loglevel", "quiet", "rtp://$(arg host):$(arg port)"]
  send_args: ["$(arg source)"]
stop_timeout_ms: 250
"#;
        let config = RelayConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.engine.program, "ffplay");
        assert_eq!(config.stop_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = RelayConfig::from_yaml("stop_timeout_ms: 100\n").unwrap();
        assert_eq!(config.engine, EngineProfile::default());

        let config = RelayConfig::from_yaml("{}").unwrap();
        assert_eq!(config.stop_timeout_ms, 5000);

        let config = RelayConfig::from_yaml("engine:\n  program: /opt/vlc/cvlc\n").unwrap();
        assert_eq!(config.engine.program, "/opt/vlc/cvlc");
        assert_eq!(config.engine.send_args, EngineProfile::default().send_args);
    }

    #[test]
    fn test_validation_rejects_source_in_receiver() {
        let yaml = r#"
engine:
  program: cvlc
  receive_args: ["$(arg source)"]
  send_args: []
"#;
        assert!(matches!(
            RelayConfig::from_yaml(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_unknown_arg() {
        let yaml = r#"
engine:
  program: cvlc
  receive_args: ["rtp://$(arg address)"]
  send_args: []
"#;
        assert!(matches!(
            RelayConfig::from_yaml(yaml),
            Err(ConfigError::Substitution { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_empty_program() {
        let yaml = r#"
engine:
  program: "  "
  receive_args: []
  send_args: []
"#;
        assert!(RelayConfig::from_yaml(yaml).is_err());
    }
}
