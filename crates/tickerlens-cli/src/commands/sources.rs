use serde::Serialize;
use tickerlens_core::{Dashboard, ProviderId, SourceSnapshot};

use crate::error::CliError;

use super::CommandOutput;

#[derive(Debug, Serialize)]
struct SourcesData {
    sources: Vec<SourceRow>,
}

#[derive(Debug, Serialize)]
struct SourceRow {
    id: ProviderId,
    name: &'static str,
    status: &'static str,
    available: bool,
    score: u16,
    endpoints: Vec<&'static str>,
}

impl From<SourceSnapshot> for SourceRow {
    fn from(snapshot: SourceSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.id.display_name(),
            status: snapshot.status_label(),
            available: snapshot.available(),
            score: snapshot.health.score,
            endpoints: snapshot.capabilities.supported_endpoints(),
        }
    }
}

pub async fn run(dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let snapshots = dashboard.sources().await;
    let source_chain = snapshots.iter().map(|snapshot| snapshot.id).collect();
    let sources = snapshots.into_iter().map(SourceRow::from).collect();

    let data = serde_json::to_value(SourcesData { sources })?;
    Ok(CommandOutput::local(data, source_chain))
}
