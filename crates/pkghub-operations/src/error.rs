use miette::Diagnostic;
use pkghub_config::error::ConfigError;
use pkghub_registry::RegistryError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum OperationError {
    #[error("Package `{0}` not found")]
    #[diagnostic(
        code(pkghub_operations::package_not_found),
        help("Run `pkghub search` to find available packages")
    )]
    PackageNotFound(String),

    #[error("Version {version} of package `{name}` not found")]
    #[diagnostic(
        code(pkghub_operations::version_not_found),
        help("Available versions: {available}")
    )]
    VersionNotFound {
        name: String,
        version: String,
        available: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, OperationError>;
