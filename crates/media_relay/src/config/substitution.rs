//! Substitution of $(arg name) patterns in engine argument templates

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching substitution patterns: $(type value)
static SUBSTITUTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\((\w+)\s+([^)]+)\)|\$\((\w+)\)").unwrap());

/// Argument names an engine template may reference
pub const KNOWN_ARGS: [&str; 4] = ["host", "port", "source", "ttl"];

/// Values available to a template
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    pub args: HashMap<String, String>,
}

impl SubstitutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Substitute all patterns in a string.
    ///
    /// Runs a single pass: substituted values are never scanned again, so a
    /// source path that happens to contain `$(` reaches the engine verbatim.
    pub fn substitute(&self, input: &str) -> Result<String, SubstitutionError> {
        let mut error: Option<SubstitutionError> = None;

        let result = SUBSTITUTION_PATTERN.replace_all(input, |caps: &Captures| {
            if error.is_some() {
                return String::new();
            }
            match self.resolve_capture(caps) {
                Ok(value) => value,
                Err(e) => {
                    error = Some(e);
                    String::new()
                }
            }
        });

        if let Some(e) = error {
            return Err(e);
        }

        Ok(result.into_owned())
    }

    fn resolve_capture(&self, caps: &Captures) -> Result<String, SubstitutionError> {
        let (subst_type, value) = split_capture(caps)?;
        match subst_type {
            "arg" => self
                .args
                .get(value)
                .cloned()
                .ok_or_else(|| SubstitutionError::UndefinedArg(value.to_string())),
            other => Err(SubstitutionError::UnknownType(other.to_string())),
        }
    }
}

/// List the argument names referenced by a template, rejecting anything
/// that is not a `$(arg <known name>)` pattern
pub fn referenced_args(template: &str) -> Result<Vec<String>, SubstitutionError> {
    let mut names = Vec::new();
    for caps in SUBSTITUTION_PATTERN.captures_iter(template) {
        let (subst_type, value) = split_capture(&caps)?;
        if subst_type != "arg" {
            return Err(SubstitutionError::UnknownType(subst_type.to_string()));
        }
        if !KNOWN_ARGS.contains(&value) {
            return Err(SubstitutionError::UndefinedArg(value.to_string()));
        }
        names.push(value.to_string());
    }
    Ok(names)
}

fn split_capture<'a>(caps: &Captures<'a>) -> Result<(&'a str, &'a str), SubstitutionError> {
    // $(type value)
    if let (Some(subst_type), Some(value)) = (caps.get(1), caps.get(2)) {
        return Ok((subst_type.as_str(), value.as_str().trim()));
    }

    // $(type)
    if let Some(subst_type) = caps.get(3) {
        return Ok((subst_type.as_str(), ""));
    }

    Err(SubstitutionError::InvalidPattern(
        caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default(),
    ))
}

/// Errors that can occur during substitution
#[derive(Debug, thiserror::Error)]
pub enum SubstitutionError {
    #[error("Unknown substitution type: {0}")]
    UnknownType(String),

    #[error("Undefined argument: {0}")]
    UndefinedArg(String),

    #[error("Invalid substitution pattern: {0}")]
    InvalidPattern(String),
}
