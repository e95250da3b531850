use std::fmt;

use tickerlens_core::{EnvelopeMeta, ProviderId, ValidationError};
use uuid::Uuid;

/// Random per-invocation id, so a run can be matched to its log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// What a command reports about how its data was obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub source_chain: Vec<ProviderId>,
    pub latency_ms: u64,
    pub warnings: Vec<String>,
}

impl Provenance {
    pub fn into_meta(self, request_id: RequestId) -> Result<EnvelopeMeta, ValidationError> {
        let meta = EnvelopeMeta::new(request_id.to_string(), self.source_chain, self.latency_ms)?;
        Ok(meta.with_warnings(self.warnings))
    }
}
