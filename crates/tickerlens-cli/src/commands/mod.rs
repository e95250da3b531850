mod history;
mod indicators;
mod movers;
mod overview;
mod quote;
mod search;
mod sources;

use serde::Serialize;
use serde_json::Value;
use tickerlens_core::{
    Config, CoreError, Dashboard, Envelope, EnvelopeError, ProviderId, RouteFailure, Routed,
    SourceStrategy, Symbol,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Provenance, RequestId};

pub struct CommandOutput {
    pub data: Value,
    pub provenance: Provenance,
    pub errors: Vec<EnvelopeError>,
    /// No provider produced data.
    pub failed: bool,
}

impl CommandOutput {
    /// Output computed without a routed call.
    pub fn local(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            provenance: Provenance {
                source_chain,
                ..Provenance::default()
            },
            errors: Vec::new(),
            failed: false,
        }
    }

    fn routed<T: Serialize>(routed: Routed<T>) -> Result<Self, CliError> {
        Ok(Self {
            data: serde_json::to_value(&routed.data)?,
            provenance: Provenance {
                source_chain: routed.source_chain,
                latency_ms: routed.latency_ms,
                warnings: routed.warnings,
            },
            errors: routed.errors,
            failed: false,
        })
    }

    fn exhausted(failure: RouteFailure, empty: Value) -> Self {
        Self {
            data: empty,
            provenance: Provenance {
                source_chain: failure.source_chain,
                latency_ms: failure.latency_ms,
                warnings: failure.warnings,
            },
            errors: failure.errors,
            failed: true,
        }
    }
}

/// A route failure still renders an envelope, with `empty` as its data.
fn finish<T: Serialize>(
    result: Result<Routed<T>, CoreError>,
    empty: impl FnOnce() -> Value,
) -> Result<CommandOutput, CliError> {
    match result {
        Ok(routed) => CommandOutput::routed(routed),
        Err(CoreError::Route(failure)) => Ok(CommandOutput::exhausted(failure, empty())),
        Err(error) => Err(error.into()),
    }
}

pub fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::from_env()?;
    if let Some(source) = cli.source.as_deref() {
        config = config.with_source(source.parse::<SourceStrategy>()?);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms)?;
    }
    if cli.offline {
        config = config.with_offline(true);
    }
    Ok(config)
}

pub struct Outcome {
    pub envelope: Envelope<Value>,
    pub failed: bool,
}

pub async fn execute(cli: &Cli, request_id: RequestId) -> Result<Outcome, CliError> {
    let config = load_config(cli)?;
    tracing::debug!(offline = config.offline, source = ?config.source, "configuration loaded");
    let dashboard = Dashboard::from_config(&config);

    let mut output = match &cli.command {
        Command::Quote(args) => quote::run(args, &dashboard).await?,
        Command::History(args) => history::run(args, &dashboard).await?,
        Command::Indicators(args) => indicators::run(args, &dashboard).await?,
        Command::Overview(args) => overview::run(args, &dashboard).await?,
        Command::Movers(args) => movers::run(args, &dashboard).await?,
        Command::Search(args) => search::run(args, &dashboard).await?,
        Command::Sources => sources::run(&dashboard).await?,
    };

    if config.offline {
        output
            .provenance
            .warnings
            .insert(0, String::from("offline mode: data is synthetic"));
    }

    let meta = output.provenance.into_meta(request_id)?;
    Ok(Outcome {
        envelope: Envelope::with_errors(meta, output.data, output.errors)?,
        failed: output.failed,
    })
}

fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    raw.iter()
        .map(|symbol| symbol.parse::<Symbol>().map_err(CliError::from))
        .collect()
}
