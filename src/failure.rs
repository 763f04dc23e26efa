//! Failure reports and handlers
//!
//! Containers never recover from errors. Handles, modules and the configurator
//! turn them into a [`FailureReport`] and pass it to a [`FailureHandler`],
//! which by default logs the report and aborts the process.

use crate::contract::ContractId;
use crate::errors::{invalid_value, ConfigError, ContainerError, RegistrationError};
use serde::Deserialize;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;
use std::sync::Arc;

/// Called synchronously with every failure surfaced by the wiring layer
pub type FailureHandler = Arc<dyn Fn(&FailureReport) + Send + Sync>;

/// Human readable failure plus whatever context is known about it
#[derive(Debug, Clone)]
pub struct FailureReport {
    message: String,
    error: Option<ContainerError>,
    location: Option<&'static Location<'static>>,
}

impl FailureReport {
    /// A report that does not come from a container error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            location: None,
        }
    }

    pub fn from_error(error: impl Into<ContainerError>) -> Self {
        let error = error.into();
        Self {
            message: error.to_string(),
            error: Some(error),
            location: None,
        }
    }

    /// Attaches the call site the failure is attributed to
    pub fn at(mut self, location: &'static Location<'static>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&ContainerError> {
        self.error.as_ref()
    }

    pub fn contract(&self) -> Option<ContractId> {
        self.error.as_ref().map(ContainerError::contract)
    }

    pub fn location(&self) -> Option<&'static Location<'static>> {
        self.location
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(
                f,
                "{} (at {}:{})",
                self.message,
                location.file(),
                location.line()
            ),
            None => f.write_str(&self.message),
        }
    }
}

/// What the default handlers do with a failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Panic with the report. Only unwinds the calling thread.
    Panic,
    /// Log the report and abort the process
    #[default]
    Abort,
    /// Log the report and return
    Log,
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "panic" => Ok(FailurePolicy::Panic),
            "abort" => Ok(FailurePolicy::Abort),
            "log" => Ok(FailurePolicy::Log),
            _ => Err(invalid_value("failure.policy", s)),
        }
    }
}

/// Builds the handler implementing `policy`
pub fn handler_for(policy: FailurePolicy) -> FailureHandler {
    match policy {
        FailurePolicy::Panic => Arc::new(|report: &FailureReport| panic!("{}", report)),
        FailurePolicy::Abort => Arc::new(|report: &FailureReport| {
            tracing::error!("{}", report);
            eprintln!("light-injection: {}", report);
            std::process::abort();
        }),
        FailurePolicy::Log => Arc::new(|report: &FailureReport| tracing::error!("{}", report)),
    }
}

/// Hands a failed registration to `handler`, attributed to `location`
pub(crate) fn report_registration(
    handler: &FailureHandler,
    result: Result<(), RegistrationError>,
    location: &'static Location<'static>,
) {
    if let Err(error) = result {
        tracing::warn!("{}", error);
        handler(&FailureReport::from_error(error).at(location));
    }
}
