use serde_json::json;
use tickerlens_core::{Dashboard, ValidationError};

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::{finish, CommandOutput};

pub async fn run(args: &SearchArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyQuery.into());
    }

    finish(dashboard.search(query, args.limit).await, || {
        json!({ "query": query, "results": [] })
    })
}
