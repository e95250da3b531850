use serde_json::json;
use tickerlens_core::Dashboard;

use crate::cli::MoversArgs;
use crate::error::CliError;

use super::{finish, CommandOutput};

pub async fn run(args: &MoversArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    finish(dashboard.market_overview(usize::from(args.limit)).await, || {
        json!({ "gainers": [], "losers": [], "actives": [] })
    })
}
