// ABOUTME: CLI entrypoint for the onedown command
// ABOUTME: Tracing init, Ctrl+C wiring, and error-to-exit-code mapping

use clap::Parser;
use onedown::{
    api::GraphClient,
    auth::{resolve_token, StaticToken},
    cli::{Cli, Commands},
    export::{CancelFlag, ExportOptions, Exporter, PartialListings},
    writer::ExportWriter,
    Result,
};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    match run() {
        Ok(degraded) if degraded => {
            // Completed, but some items were recorded as failures
            std::process::exit(1);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("onedown: [E{}] {}", e.exit_code(), e);
            std::process::exit(e.exit_code());
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("onedown=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    match cli.command() {
        Commands::Export {
            output,
            notebook,
            section,
            report,
            discard_partial_listings,
            quiet,
        } => {
            let client_id = cli
                .client_id
                .or_else(|| std::env::var("ONEDOWN_CLIENT_ID").ok());
            let token = resolve_token(cli.token, client_id.as_deref())?;
            let client =
                GraphClient::new(Box::new(StaticToken::new(token)), Some(cli.api_base))?;

            let cancel = CancelFlag::default();
            {
                let cancel = cancel.clone();
                ctrlc::set_handler(move || cancel.cancel()).map_err(|e| {
                    onedown::Error::Filesystem(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("failed to install Ctrl+C handler: {}", e),
                    ))
                })?;
            }

            let options = ExportOptions {
                notebook_filter: notebook,
                section_filter: section,
                partial_listings: if discard_partial_listings {
                    PartialListings::Discard
                } else {
                    PartialListings::Keep
                },
                quiet,
            };

            let mut exporter = Exporter::new(
                &client,
                ExportWriter::new(output.clone()),
                options,
                cancel,
            );
            let run_report = exporter.run()?;

            if report {
                let path = run_report.write_json(&output)?;
                if !quiet {
                    println!("report written to {}", path.display());
                }
            }

            Ok(run_report.is_degraded())
        }
    }
}
