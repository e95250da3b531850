use std::io::{self, Write};

use serde_json::Value;
use tickerlens_core::Envelope;

use crate::error::CliError;

/// Writes the envelope as one JSON document on stdout.
pub fn render(envelope: &Envelope<Value>, pretty: bool) -> Result<(), CliError> {
    let payload = to_json(envelope, pretty)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{payload}")?;
    Ok(())
}

fn to_json(envelope: &Envelope<Value>, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tickerlens_core::{EnvelopeMeta, ProviderId};

    use super::*;

    #[test]
    fn compact_output_is_single_line_and_omits_empty_errors() {
        let meta = EnvelopeMeta::new("request-12345", vec![ProviderId::Yahoo], 7).expect("meta");
        let envelope = Envelope::success(meta, json!({ "quotes": [] }));

        let compact = to_json(&envelope, false).expect("serializes");
        let pretty = to_json(&envelope, true).expect("serializes");

        assert!(!compact.contains('\n'));
        assert!(!compact.contains("\"errors\""));
        assert!(compact.contains("\"source_chain\":[\"yahoo\"]"));
        assert!(pretty.contains('\n'));
    }
}
