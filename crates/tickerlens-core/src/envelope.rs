//! JSON envelope wrapped around every CLI payload.
//!
//! ```json
//! { "meta": { "request_id": "...", "schema_version": "v1.0.0", "generated_at": "...",
//!             "source_chain": ["yahoo"], "latency_ms": 84 },
//!   "data": { ... },
//!   "errors": [ { "code": "RATE_LIMIT", "message": "...", "retryable": true, "source": "alphavantage" } ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::{CoreError, ProviderId, SourceError, UtcDateTime, ValidationError};

pub const SCHEMA_VERSION: &str = "v1.0.0";
const MIN_REQUEST_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    /// Envelope carrying provider errors next to whatever data was produced.
    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, ValidationError> {
        meta.validate()?;
        errors.iter().try_for_each(EnvelopeError::validate)?;
        Ok(Self { meta, data, errors })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    /// Providers tried, in order. Empty for commands that never leave the process.
    pub source_chain: Vec<ProviderId>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        source_chain: Vec<ProviderId>,
        latency_ms: u64,
    ) -> Result<Self, ValidationError> {
        let meta = Self {
            request_id: request_id.into(),
            schema_version: String::from(SCHEMA_VERSION),
            generated_at: UtcDateTime::now(),
            source_chain,
            latency_ms,
            warnings: Vec::new(),
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_id.trim().len() < MIN_REQUEST_ID_LEN {
            return Err(ValidationError::InvalidRequestId);
        }
        if !is_semver_tag(&self.schema_version) {
            return Err(ValidationError::InvalidSchemaVersion {
                value: self.schema_version.clone(),
            });
        }
        Ok(())
    }
}

/// One entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ProviderId>,
}

impl EnvelopeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            retryable: None,
            source: None,
        };
        error.validate()?;
        Ok(error)
    }

    /// Always valid: a blank provider message falls back to the error code.
    pub fn from_source(provider: Option<ProviderId>, error: &SourceError) -> Self {
        let message = match error.message().trim() {
            "" => error.code(),
            text => text,
        };
        Self {
            code: error.code().to_owned(),
            message: message.to_owned(),
            retryable: Some(error.retryable()),
            source: provider,
        }
    }

    fn fixed(code: &str, error: &CoreError) -> Self {
        Self {
            code: code.to_owned(),
            message: error.to_string(),
            retryable: Some(false),
            source: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            Err(ValidationError::EmptyErrorCode)
        } else if self.message.trim().is_empty() {
            Err(ValidationError::EmptyErrorMessage)
        } else {
            Ok(())
        }
    }
}

impl From<&CoreError> for EnvelopeError {
    /// A routed failure reports its last provider error.
    fn from(error: &CoreError) -> Self {
        match error {
            CoreError::Route(failure) => failure
                .last_error()
                .cloned()
                .unwrap_or_else(|| Self::fixed("NO_SOURCE", error)),
            CoreError::Source(source) => Self::from_source(None, source),
            CoreError::Validation(_) => Self::fixed("VALIDATION_ERROR", error),
            CoreError::Config(_) => Self::fixed("CONFIG_ERROR", error),
            CoreError::Serialization(_) => Self::fixed("SERIALIZATION_ERROR", error),
        }
    }
}

/// `v` followed by exactly three dot-separated numbers.
fn is_semver_tag(value: &str) -> bool {
    let Some(numbers) = value.strip_prefix('v') else {
        return false;
    };
    let parts = numbers.split('.').collect::<Vec<_>>();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
