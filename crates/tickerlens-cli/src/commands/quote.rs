use serde_json::json;
use tickerlens_core::Dashboard;

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::{finish, parse_symbols, CommandOutput};

pub async fn run(args: &QuoteArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    finish(dashboard.quotes(symbols).await, || json!({ "quotes": [] }))
}
