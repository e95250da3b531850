use serde_json::Value;
use tickerlens_core::{Dashboard, IndicatorSettings, Symbol};

use crate::cli::OverviewArgs;
use crate::error::CliError;

use super::{finish, CommandOutput};

pub async fn run(args: &OverviewArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let settings = IndicatorSettings {
        history_days: args.days,
        ..IndicatorSettings::default()
    };

    finish(dashboard.overview(symbol, settings).await, || Value::Null)
}
