use thiserror::Error;

use tickerlens_core::{ConfigError, CoreError, RouteFailure, SourceError, ValidationError};

/// Failures that end the process before an envelope is written.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("provider error: {0}")]
    Provider(#[from] SourceError),
    #[error("{0}")]
    Route(#[from] RouteFailure),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("could not encode output: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("could not write output: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// 2 bad input, 3 no data, 4 encoding, 6 configuration, 10 I/O.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Provider(_) | Self::Route(_) => 3,
            Self::Serialization(_) => 4,
            Self::Config(_) => 6,
            Self::Io(_) => 10,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(inner) => inner.into(),
            CoreError::Source(inner) => inner.into(),
            CoreError::Route(inner) => inner.into(),
            CoreError::Config(inner) => inner.into(),
            CoreError::Serialization(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_category_has_its_own_exit_code() {
        let cases = [
            (CliError::from(ValidationError::EmptyQuery), 2),
            (CliError::from(SourceError::invalid_symbol("unknown ticker")), 3),
            (CliError::from(ConfigError::ZeroTimeout), 6),
            (CliError::from(std::io::Error::other("broken pipe")), 10),
        ];
        for (error, code) in cases {
            assert_eq!(error.exit_code(), code, "{error}");
        }
    }

    #[test]
    fn core_errors_keep_their_category() {
        let error = CliError::from(CoreError::Validation(ValidationError::EmptySymbolList));
        assert!(matches!(error, CliError::Validation(_)));
        assert_eq!(error.to_string(), "invalid input: no symbols were given");
    }
}
