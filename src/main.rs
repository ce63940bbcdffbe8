//! Release Status Reports CLI
//!
//! Generate release-readiness status reports from tracking spreadsheets.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relstat::{
    build_runtime, ControllerConfig, EscalationOutcome, JobController, JobOutcome, ReportRequest,
    Settings,
};

#[derive(Parser)]
#[command(name = "relstat")]
#[command(about = "Generate release status reports from tracking spreadsheets", long_about = None)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, default_value = "settings.json", global = true)]
    settings: PathBuf,

    /// Override the output folder from the settings file
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Override the escalation threshold from the settings file
    #[arg(long, global = true)]
    escalation_days: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report one tracking worksheet
    Run {
        /// Source workbook
        workbook: PathBuf,

        /// Worksheet name
        worksheet: String,
    },

    /// Report a multi-table worksheet such as a release checklist
    Special {
        /// Source workbook
        workbook: PathBuf,

        /// Worksheet name
        worksheet: String,
    },

    /// Report every worksheet in a workbook
    Batch {
        /// Source workbook
        workbook: PathBuf,
    },

    /// Validate the settings file
    Validate,

    /// Generate a sample settings file
    GenerateSettings {
        /// Output path for the settings file
        #[arg(default_value = "settings.json")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            workbook,
            worksheet,
        } => {
            let (settings, output_dir) = load_settings(&cli.settings, cli.output)?;
            let request = ReportRequest::standard(
                workbook,
                worksheet,
                output_dir,
                settings.recipient_list(),
                settings.escalation_recipient_list(),
                cli.escalation_days.unwrap_or(settings.escalation_days),
            );
            report_command(request)?;
        }

        Commands::Special {
            workbook,
            worksheet,
        } => {
            let (_, output_dir) = load_settings(&cli.settings, cli.output)?;
            let request = ReportRequest::special(workbook, worksheet, output_dir);
            report_command(request)?;
        }

        Commands::Batch { workbook } => {
            let (settings, output_dir) = load_settings(&cli.settings, cli.output)?;
            let mut request = ReportRequest::batch(workbook, output_dir);
            request.recipients = settings.recipient_list();
            request.escalation_recipients = settings.escalation_recipient_list();
            request.escalation_days = cli.escalation_days.unwrap_or(settings.escalation_days);
            report_command(request)?;
        }

        Commands::Validate => {
            validate_command(&cli.settings)?;
        }

        Commands::GenerateSettings { path } => {
            generate_settings_command(&path)?;
        }
    }

    Ok(())
}

fn load_settings(path: &Path, output_override: Option<PathBuf>) -> Result<(Settings, PathBuf)> {
    let settings = Settings::load(path)?;
    settings.validate()?;
    let output_dir = output_override.unwrap_or_else(|| settings.output_dir());
    Ok((settings, output_dir))
}

fn report_command(request: ReportRequest) -> Result<()> {
    let tuning = request.tuning.clone();
    let runtime = build_runtime(None)?;

    runtime.block_on(async {
        let controller = JobController::new(ControllerConfig::from_tuning(&tuning));
        let mut job = controller.submit(request)?;
        tracing::info!(job = %job.id(), "report job submitted");

        let outcome = tokio::select! {
            outcome = job.wait() => outcome,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, cancelling job");
                job.cancel();
                job.wait().await
            }
        }?;

        match outcome {
            JobOutcome::Finished(output) => {
                if output.partial {
                    println!("Cancelled mid-run; keeping what was already reported");
                }
                for sheet in &output.sheets {
                    println!(
                        "{} [{}]: {} rows, {} escalated",
                        sheet.worksheet,
                        sheet.flavor.label(),
                        sheet.rows,
                        sheet.escalated
                    );
                    if let Some(path) = &sheet.html_path {
                        println!("  html: {}", path.display());
                    }
                    if let Some(path) = &sheet.export_path {
                        println!("  xlsx: {}", path.display());
                    }
                    for err in &sheet.artifact_errors {
                        println!("  artifact error: {err}");
                    }
                    match &sheet.escalation {
                        EscalationOutcome::Sent { recipients, rows } => {
                            println!("  escalation sent to {recipients} recipient(s) for {rows} row(s)");
                        }
                        EscalationOutcome::Failed(reason) => {
                            println!("  escalation failed: {reason}");
                        }
                        EscalationOutcome::NotConfigured | EscalationOutcome::Skipped(_) => {}
                    }
                }
                for (name, reason) in &output.skipped {
                    println!("skipped '{name}': {reason}");
                }
                for warning in &output.warnings {
                    println!("warning: {warning}");
                }
                if let Some(archive) = &output.archive_path {
                    println!("source archived to {}", archive.display());
                }
            }
            JobOutcome::NothingToDo { worksheet, reason } => {
                println!("Nothing to report for '{worksheet}': {reason}");
            }
        }

        Ok(())
    })
}

fn validate_command(path: &Path) -> Result<()> {
    let settings = Settings::load(path)?;
    settings.validate()?;
    println!("Settings are valid");
    Ok(())
}

fn generate_settings_command(path: &Path) -> Result<()> {
    let sample = Settings {
        recipients: "pm@example.com; lead@example.com".to_string(),
        escalation_days: 7,
        escalation_recipients: "director@example.com".to_string(),
        output_folder: "reports".to_string(),
    };
    sample.save(path)?;
    println!("Generated sample settings at: {}", path.display());

    Ok(())
}
