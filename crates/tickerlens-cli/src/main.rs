mod cli;
mod commands;
mod error;
mod logging;
mod metadata;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing::Instrument;

use crate::cli::Cli;
use crate::error::CliError;
use crate::metadata::RequestId;

/// Exit status when the envelope was written but no provider produced data.
const EXIT_NO_DATA: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let request_id = RequestId::generate();
    let span = tracing::info_span!("request", %request_id);
    match run(&cli, request_id).instrument(span).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NO_DATA),
        Err(error) => {
            tracing::debug!(?error, %request_id, "command failed");
            eprintln!("tickerlens: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

/// True when the command produced data.
async fn run(cli: &Cli, request_id: RequestId) -> Result<bool, CliError> {
    let outcome = commands::execute(cli, request_id).await?;
    output::render(&outcome.envelope, cli.pretty)?;
    Ok(!outcome.failed)
}
