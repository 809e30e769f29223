//! spapi CLI - Selling Partner API from the command line
//!
//! Runs the OAuth consent flow, submits feeds and fetches reports using the
//! credentials from `~/.config/spapi/config.toml` and the environment.
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use secrecy::ExposeSecret;

use spapi::{
    CreateReportSpecification, FeedSubmission, Region, SellingPartnerClient, Workflow,
    XML_CONTENT_TYPE,
};

mod config;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "spapi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (default: ~/.config/spapi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Region to use (na, eu, fe), overriding the config file
    #[arg(long, global = true)]
    region: Option<Region>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the Seller Central consent URL
    AuthorizeUrl {
        /// Opaque state echoed back to the redirect URI
        #[arg(long, default_value = "spapi")]
        state: String,
    },

    /// Exchange an authorization code for a token pair
    ExchangeCode {
        /// Code received on the redirect URI
        code: String,
    },

    /// Upload a feed and wait for its processing report
    SubmitFeed {
        /// File holding the feed content
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Feed type (e.g. POST_PRODUCT_DATA)
        #[arg(long)]
        feed_type: String,

        /// Marketplace ids (repeatable or comma-separated)
        #[arg(long = "marketplace", required = true, value_delimiter = ',')]
        marketplace_ids: Vec<String>,

        /// Content type of the feed
        #[arg(long, default_value = XML_CONTENT_TYPE)]
        content_type: String,
    },

    /// Show the status of a feed
    FeedStatus {
        /// Feed id
        feed_id: String,
    },

    /// Request a report, wait for it and download it
    RequestReport {
        /// Report type (e.g. GET_MERCHANT_LISTINGS_ALL_DATA)
        #[arg(long)]
        report_type: String,

        /// Marketplace ids (repeatable or comma-separated)
        #[arg(long = "marketplace", required = true, value_delimiter = ',')]
        marketplace_ids: Vec<String>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the status of a report
    ReportStatus {
        /// Report id
        report_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_env(|name| std::env::var(name).ok())?;
    if let Some(region) = cli.region {
        config.region = Some(region);
    }
    match cli.command {
        Commands::AuthorizeUrl { .. } => config.validate_consent()?,
        _ => config.validate()?,
    }

    let client = SellingPartnerClient::new(
        config.client_config(),
        config.credentials(),
        config.tokens(),
    )
    .context("Failed to create client")?;

    match cli.command {
        Commands::AuthorizeUrl { state } => {
            println!("{}", client.authorization_url(&state)?);
        }
        Commands::ExchangeCode { code } => {
            let tokens = client.exchange_authorization_code(&code).await?;
            println!("{} authorization code exchanged", "✓".bright_green());
            if let Some(refresh_token) = &tokens.refresh_token {
                println!(
                    "{} {}",
                    "refresh_token:".bright_blue(),
                    refresh_token.expose_secret()
                );
            }
        }
        Commands::SubmitFeed {
            file,
            feed_type,
            marketplace_ids,
            content_type,
        } => {
            let content = std::fs::read(&file)
                .with_context(|| format!("Failed to read feed file {}", file.display()))?;
            let submission = FeedSubmission::xml(feed_type, marketplace_ids, content)
                .with_content_type(content_type);

            let outcome = workflow(client).submit_feed(&submission).await?;
            println!(
                "{} feed {} processed (report document {})",
                "✓".bright_green(),
                outcome.feed_id,
                outcome.result_document_id
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome.processing_report)?
            );
        }
        Commands::FeedStatus { feed_id } => {
            let record = client.feeds().get_feed(&feed_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::RequestReport {
            report_type,
            marketplace_ids,
            output,
        } => {
            let spec = CreateReportSpecification::builder()
                .report_type(report_type)
                .marketplace_ids(marketplace_ids)
                .build();

            let outcome = workflow(client).fetch_report(&spec).await?;
            if outcome.document.is_compressed() {
                log::warn!("Report {} is compressed; writing raw bytes", outcome.report_id);
            }

            match output {
                Some(path) => {
                    std::fs::write(&path, outcome.document.into_bytes())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "{} report {} written to {}",
                        "✓".bright_green(),
                        outcome.report_id,
                        path.display()
                    );
                }
                None => {
                    std::io::stdout().write_all(&outcome.document.into_bytes())?;
                }
            }
        }
        Commands::ReportStatus { report_id } => {
            let record = client.reports().get_report(&report_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

fn workflow(client: SellingPartnerClient) -> Workflow {
    Workflow::new(client)
        .with_progress_callback(|step| eprintln!("{} {step}", "○".bright_blue()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_submit_feed() {
        let cli = Cli::try_parse_from([
            "spapi",
            "--region",
            "eu",
            "submit-feed",
            "products.xml",
            "--feed-type",
            "POST_PRODUCT_DATA",
            "--marketplace",
            "A1PA6795UKMFR9,A1RKKUPIHCS9HS",
        ])
        .unwrap();

        assert_eq!(cli.region, Some(Region::Europe));
        assert!(matches!(
            cli.command,
            Commands::SubmitFeed { ref marketplace_ids, ref content_type, .. }
                if marketplace_ids.len() == 2 && content_type == XML_CONTENT_TYPE
        ));
    }

    #[test]
    fn test_marketplace_is_required() {
        let result = Cli::try_parse_from([
            "spapi",
            "request-report",
            "--report-type",
            "GET_MERCHANT_LISTINGS_ALL_DATA",
        ]);
        assert!(result.is_err());
    }
}
