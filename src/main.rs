use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mail_sorter::config::{AirtableConfig, GraphConfig, SmtpConfig, SorterConfig};
use mail_sorter::graph::GraphClient;
use mail_sorter::outbound::{SimulatedSender, SmtpSender};
use mail_sorter::pipeline::types::{BatchReport, Category, DraftSender, MailTransport};
use mail_sorter::pipeline::{EmailSorter, PoDrafter};
use mail_sorter::sink::{AirtableSink, LogSink, NoopSink};

#[derive(Parser)]
#[command(name = "mail-sorter", version, about = "Sort shared-mailbox email into category folders")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Classify and file one batch of unread email
    Sort,
    /// Send a purchase-order acknowledgement
    DraftPo {
        /// Message to reply to; defaults to the first unread PO email
        #[arg(long)]
        message_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // A missing .env is fine; variables may come from the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let graph_config = GraphConfig::from_env().context("Graph configuration")?;
    let sorter_config = SorterConfig::from_env().context("Sorter configuration")?;

    let transport: Arc<dyn MailTransport> = Arc::new(GraphClient::new(&graph_config));
    let sink: Arc<dyn LogSink> = match AirtableConfig::from_env() {
        Some(config) => Arc::new(AirtableSink::new(config)),
        None => {
            tracing::warn!("Airtable not configured, decisions will not be logged");
            Arc::new(NoopSink)
        }
    };

    match cli.command.unwrap_or(Command::Sort) {
        Command::Sort => {
            let sorter = EmailSorter::new(transport, sink, sorter_config);
            let report = sorter.run_batch().await.context("Sorting run failed")?;
            print_report(&report);
        }
        Command::DraftPo { message_id } => {
            let sender: Arc<dyn DraftSender> =
                match SmtpConfig::from_env().context("SMTP configuration")? {
                    Some(config) => Arc::new(SmtpSender::new(config)),
                    None => Arc::new(SimulatedSender),
                };
            let drafter = PoDrafter::new(transport, sink, sender, sorter_config);

            let message_id = match message_id {
                Some(id) => id,
                None => match drafter.find_po_email().await? {
                    Some(message) => message.id,
                    None => {
                        println!("No unread purchase order found.");
                        return Ok(());
                    }
                },
            };

            let outcome = drafter
                .draft_po_reply(&message_id)
                .await
                .with_context(|| format!("Drafting reply to {message_id}"))?;
            println!("Replied to {} ({})", outcome.recipient, outcome.subject);
            println!("{}", outcome.confirmation);
        }
    }

    Ok(())
}

fn print_report(report: &BatchReport) {
    if report.is_empty() {
        println!("No unread emails to process.");
        return;
    }

    println!("Sorted {} email(s):", report.sorted.len());
    for category in Category::ALL {
        println!("  {:<16} {}", category.folder_name(), report.count(category));
    }
    println!("Moved: {}", report.moved_count());

    if !report.failures.is_empty() {
        println!("Failures: {}", report.failures.len());
        for failure in &report.failures {
            println!("  {}: {}", failure.email_id, failure.reason);
        }
    }
}
