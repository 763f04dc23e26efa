use crate::contract::ContractId;
use thiserror::Error;

/// Raised by `register` / `register_lazy`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Trying to register `{0}` twice!")]
    DuplicateRegistration(ContractId),
}

/// Raised by `resolve` and by dependency handles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("There are no factories or instances registered for `{0}`!")]
    NotFound(ContractId),
    /// The stored value cannot be handed out as the requested contract
    #[error("The value registered for `{0}` does not have the requested type!")]
    TypeMismatch(ContractId),
    #[error("Attempted to resolve `{0}` twice!")]
    DoubleResolution(ContractId),
    /// The factory of this contract asked for the contract itself
    #[error("Circular dependency detected while building `{0}`!")]
    CircularDependency(ContractId),
}

/// Coarse classification of container failures, used in reports and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DuplicateRegistration,
    NotFound,
    TypeMismatch,
    DoubleResolution,
    CircularDependency,
}

/// Any failure coming out of a container
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl RegistrationError {
    pub fn contract(&self) -> ContractId {
        match self {
            RegistrationError::DuplicateRegistration(contract) => *contract,
        }
    }
}

impl ResolutionError {
    pub fn contract(&self) -> ContractId {
        match self {
            ResolutionError::NotFound(contract)
            | ResolutionError::TypeMismatch(contract)
            | ResolutionError::DoubleResolution(contract)
            | ResolutionError::CircularDependency(contract) => *contract,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolutionError::NotFound(_) => ErrorKind::NotFound,
            ResolutionError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            ResolutionError::DoubleResolution(_) => ErrorKind::DoubleResolution,
            ResolutionError::CircularDependency(_) => ErrorKind::CircularDependency,
        }
    }
}

impl ContainerError {
    /// The contract the failure is about
    pub fn contract(&self) -> ContractId {
        match self {
            ContainerError::Registration(err) => err.contract(),
            ContainerError::Resolution(err) => err.contract(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContainerError::Registration(RegistrationError::DuplicateRegistration(_)) => {
                ErrorKind::DuplicateRegistration
            }
            ContainerError::Resolution(err) => err.kind(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{value}' for '{field}'")]
    InvalidValue { field: String, value: String },
}

pub fn invalid_value(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
