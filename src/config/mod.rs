pub mod loader;
pub mod settings;

// Re-export commonly used types
pub use loader::ConfigLoader;
pub use settings::{FailureSettings, ModuleContainerPolicy, ModuleSettings, Settings};

// Re-export constants
pub use loader::{CONFIG_PATH_ENV, FAILURE_POLICY_ENV, LOCAL_CONFIG_FILE, MODULE_CONTAINER_ENV};
