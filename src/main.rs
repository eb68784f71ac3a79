//! DLP Guard CLI Application.
//!
//! This binary exposes the decision engine, the built-in detectors and the
//! document pipeline on the command line, for policy testing and for
//! redacting documents outside a proxy.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use dlp_guard::detect::{PatternDetector, PdfTextDetector, TextDetector};
use dlp_guard::redaction::{MupdfRenderer, RegionFillRedactor, TextLayerLocator};
use dlp_guard::{DlpHandler, DocumentRedactor, Message, PolicyConfig, PolicySet, RequestMetadata};

/// Exit code for a blocked request.
const EXIT_BLOCKED: u8 = 2;

/// DLP Guard
///
/// Check LLM requests against data-loss-prevention policy and redact
/// sensitive data from text and PDF documents.
#[derive(Parser)]
#[command(name = "dlp-guard")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Policy configuration file (TOML); defaults apply when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a chat request and print the decision as JSON
    Check {
        /// JSON file holding a message array or an object with `messages`
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Target model identifier
        #[arg(short, long, default_value = "unknown")]
        model: String,

        /// User identifier recorded in audit events
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Request identifier recorded in audit events
        #[arg(long)]
        request_id: Option<String>,
    },

    /// Redact a PDF by rasterizing its pages
    RedactPdf {
        /// Input PDF file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the built-in detector's matches for a text or PDF file
    Scan {
        /// Input file path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

/// Either a bare message list or a request body carrying one.
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestInput {
    Messages(Vec<Message>),
    Body {
        messages: Vec<Message>,
        #[serde(flatten)]
        metadata: RequestMetadata,
    },
}

/// Command handler holding the loaded policies.
struct DlpCommandHandler {
    policies: PolicySet,
    verbose: bool,
}

impl DlpCommandHandler {
    /// Loads policies from `config`, or the defaults.
    fn new(config: Option<&Path>, verbose: bool) -> Result<Self> {
        let policies = match config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file does not exist: {}", path.display());
                }
                PolicySet::from_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            }
            None => PolicyConfig::default()
                .into_policy_set()
                .context("Failed to build default policies")?,
        };
        Ok(Self { policies, verbose })
    }

    fn detector(&self) -> PatternDetector {
        PatternDetector::new().with_enabled_types(self.policies.enabled_types.clone())
    }

    /// Evaluates a request file. Returns true if the request is blocked.
    fn check(
        &self,
        input: &Path,
        model: &str,
        user: &str,
        request_id: Option<String>,
    ) -> Result<bool> {
        let raw = read_input(input)?;
        let parsed: RequestInput = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid request JSON in {}", input.display()))?;
        let (messages, mut metadata) = match parsed {
            RequestInput::Messages(messages) => (messages, RequestMetadata::default()),
            RequestInput::Body { messages, metadata } => (messages, metadata),
        };
        if request_id.is_some() {
            metadata.request_id = request_id;
        }

        let handler = DlpHandler::builder(self.policies.clone())
            .build()
            .context("Failed to initialize DLP handler")?;
        let decision = handler.evaluate(user, model, &messages, &metadata);
        handler.record(&decision);

        if self.verbose {
            eprintln!("Mode:   {}", self.policies.mode);
            eprintln!("Model:  {}", model);
            eprintln!("Events: {}", decision.audit_events.len());
        }
        println!("{}", serde_json::to_string_pretty(&decision)?);
        Ok(decision.blocked)
    }

    fn redact_pdf(&self, input: &Path, output: &Path) -> Result<()> {
        let document = std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;

        let redactor = DocumentRedactor::new(
            Arc::new(PdfTextDetector::new(self.detector())),
            Arc::new(MupdfRenderer::new()),
            Arc::new(RegionFillRedactor::new(TextLayerLocator::new())),
        );
        let outcome = redactor.redact_document_with_report(&document);

        std::fs::write(output, &outcome.bytes)
            .with_context(|| format!("Failed to write to {}", output.display()))?;

        let report = &outcome.report;
        if self.verbose {
            println!("\nRedaction Summary:");
            println!("  Pages rendered:   {}", report.pages_total);
            println!("  Pages redacted:   {}", report.pages_redacted);
            println!("  Pages unredacted: {}", report.pages_unredacted);
            println!("  Pages dropped:    {}", report.pages_dropped);
        }

        if report.unchanged {
            println!("⚠ No sensitive data redacted, copied input → {}", output.display());
        } else {
            println!(
                "✓ Redacted {} page(s) → {}",
                report.pages_redacted,
                output.display()
            );
        }
        Ok(())
    }

    fn scan(&self, input: &Path) -> Result<()> {
        let bytes = std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;

        let text = if bytes.starts_with(b"%PDF") {
            PdfTextDetector::<PatternDetector>::extract_text(&bytes)
                .with_context(|| "Text extraction failed")?
        } else {
            String::from_utf8(bytes)
                .with_context(|| format!("{} is neither a PDF nor UTF-8 text", input.display()))?
        };

        let detections = self.detector().detect(&text);
        if self.verbose {
            eprintln!(
                "Found {} match(es) in {} categories",
                detections.total_matches(),
                detections.len()
            );
        }
        println!("{}", serde_json::to_string_pretty(&detections)?);
        Ok(())
    }
}

fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let handler = DlpCommandHandler::new(cli.config.as_deref(), cli.verbose)?;

    match &cli.command {
        Commands::Check {
            input,
            model,
            user,
            request_id,
        } => {
            if handler.check(input, model, user, request_id.clone())? {
                return Ok(ExitCode::from(EXIT_BLOCKED));
            }
        }
        Commands::RedactPdf { input, output } => {
            if !input.exists() {
                anyhow::bail!("Input file does not exist: {}", input.display());
            }
            handler.redact_pdf(input, output)?;
        }
        Commands::Scan { input } => {
            if !input.exists() {
                anyhow::bail!("Input file does not exist: {}", input.display());
            }
            handler.scan(input)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
