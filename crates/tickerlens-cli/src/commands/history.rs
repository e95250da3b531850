use std::str::FromStr;

use serde_json::json;
use tickerlens_core::{Dashboard, Interval, Symbol};

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::{finish, CommandOutput};

pub async fn run(args: &HistoryArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let interval = Interval::from_str(&args.interval)?;

    let result = dashboard.history(symbol.clone(), args.days, interval).await;
    finish(result, || {
        json!({ "symbol": symbol, "interval": interval, "bars": [] })
    })
}
