use serde_json::Value;
use tickerlens_core::{Dashboard, IndicatorSettings, Symbol};

use crate::cli::IndicatorsArgs;
use crate::error::CliError;

use super::{finish, CommandOutput};

pub async fn run(args: &IndicatorsArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let settings = IndicatorSettings {
        sma_period: args.sma_period,
        rsi_period: args.rsi_period,
        history_days: args.days,
    };

    finish(dashboard.indicators(symbol, settings).await, || Value::Null)
}
