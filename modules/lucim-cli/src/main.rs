//! `lucim-audit`: run the LUCIM compliance auditors over artifact files.
//!
//! Prints one JSON report on stdout. Exit status is 0 when the artifact is
//! compliant, 1 when it is not, and 2 when the invocation itself failed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lucim_audit::{DiagramAuditor, OperationModelAuditor, ScenarioAuditor};
use lucim_common::{Artifact, AuditConfig, AuditResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod input;
mod report;

use report::{to_json, Catalogue, Report};

#[derive(Parser)]
#[command(name = "lucim-audit")]
#[command(about = "Deterministic LUCIM compliance auditor")]
#[command(version)]
struct Cli {
    /// Attach a fix suggestion to every violation
    #[arg(long, global = true)]
    suggest: bool,

    /// Print single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "LUCIM_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit an operation model (raw generator output accepted)
    OperationModel {
        /// Artifact file, or `-` for stdin
        path: PathBuf,
    },

    /// Audit a scenario, JSON or text
    Scenario {
        /// Artifact file, or `-` for stdin
        path: PathBuf,

        /// Operation model enabling the cross-reference rules
        #[arg(long)]
        operation_model: Option<PathBuf>,
    },

    /// Audit a sequence diagram
    Diagram {
        /// Artifact file, or `-` for stdin
        path: PathBuf,

        /// Operation model enabling the declared-type check
        #[arg(long, conflicts_with = "raw")]
        operation_model: Option<PathBuf>,

        /// Treat the input as raw generator output (fences, prose, JSON wrapper)
        #[arg(long)]
        raw: bool,
    },

    /// Print the rule catalogue
    Rules,

    /// Print the JSON Schema of an audit result
    Schema,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match init_tracing(cli.log_json).and_then(|()| run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn log_filter() -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive("lucim=info".parse()?))
}

fn init_tracing(json: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter()?)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = AuditConfig::from_env().context("Invalid audit configuration")?;
    config.log_summary();

    let (artifact, result) = match cli.command {
        Commands::OperationModel { path } => {
            let raw = input::read_artifact(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            info!(path = %path.display(), bytes = raw.len(), "Auditing operation model");
            (Artifact::OperationModel, OperationModelAuditor::new(config).audit_raw(&raw))
        }
        Commands::Scenario { path, operation_model } => {
            let raw = input::read_artifact(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let model = operation_model
                .map(|p| input::read_model(&p).with_context(|| format!("Failed to load operation model {}", p.display())))
                .transpose()?;
            info!(path = %path.display(), with_model = model.is_some(), "Auditing scenario");
            (
                Artifact::Scenario,
                ScenarioAuditor::new(config).audit_text_or_json(&raw, model.as_ref()),
            )
        }
        Commands::Diagram { path, operation_model, raw } => {
            let text = input::read_artifact(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let auditor = DiagramAuditor::new(config);
            info!(path = %path.display(), raw, "Auditing diagram");
            let result = match operation_model {
                Some(p) => {
                    let model = input::read_model(&p)
                        .with_context(|| format!("Failed to load operation model {}", p.display()))?;
                    auditor.audit_with_model(&text, &model)
                }
                None if raw => auditor.audit_raw(&text),
                None => auditor.audit(&text),
            };
            (Artifact::Diagram, result)
        }
        Commands::Rules => {
            println!("{}", to_json(&Catalogue::current(), cli.compact)?);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(AuditResult);
            println!("{}", to_json(&schema, cli.compact)?);
            return Ok(ExitCode::SUCCESS);
        }
    };

    info!(
        artifact = %artifact,
        verdict = result.verdict(),
        violations = result.violations().len(),
        "Audit complete"
    );
    println!("{}", to_json(&Report::new(artifact, &result, cli.suggest), cli.compact)?);

    Ok(if result.verdict() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_enables_lucim_info() {
        let filter = log_filter().unwrap();
        assert!(filter.to_string().contains("lucim=info"));
    }

    #[test]
    fn diagram_raw_conflicts_with_operation_model() {
        let parsed = Cli::try_parse_from(["lucim-audit", "diagram", "d.puml", "--raw", "--operation-model", "m.json"]);
        assert!(parsed.is_err());
    }
}
