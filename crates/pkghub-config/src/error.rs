use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(pkghub_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    #[diagnostic(code(pkghub_config::toml_serialize))]
    TomlSerError(#[from] toml::ser::Error),

    #[error("Invalid index URL `{url}`: {source}")]
    #[diagnostic(
        code(pkghub_config::invalid_index_url),
        help("The index URL must be an absolute http(s) URL")
    )]
    InvalidIndexUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Unsupported index URL scheme: {0}")]
    #[diagnostic(
        code(pkghub_config::unsupported_scheme),
        help("Only http and https index URLs are supported")
    )]
    UnsupportedScheme(String),

    #[error("Invalid duration for `{field}`: {value}")]
    #[diagnostic(
        code(pkghub_config::invalid_duration),
        help("Durations look like `30s`, `1m30s` or `500ms`")
    )]
    InvalidDuration { field: &'static str, value: String },

    #[error("Search threshold must lie between 0 and 1, got {0}")]
    #[diagnostic(code(pkghub_config::invalid_threshold))]
    InvalidThreshold(f64),

    #[error("IO error: {0}")]
    #[diagnostic(code(pkghub_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
