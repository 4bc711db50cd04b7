//! CLI `certflow`.
//!
//! - `certflow run --workflow wf.json`: ejecuta un workflow y muestra el
//!   resultado y el log de cada nodo.
//! - `certflow inspect --cert cert.pem`: resume un certificado PEM.
//!
//! Códigos de salida: 0 ok, 1 run no exitoso, 2 uso/configuración.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use certflow::domain::{LogLevel, RunStatus, RunTrigger, WorkflowRun};
use certflow::config::timeout_from_secs;
use certflow::{load_workflow, AppConfig, CertificateReport, Runtime};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

const EXIT_RUN_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "certflow")]
#[command(about = "Run certificate lifecycle workflows")]
#[command(version)]
struct Cli {
    /// Nivel de log (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ejecuta un workflow definido en JSON.
    Run {
        #[arg(short, long)]
        workflow: PathBuf,
        #[arg(short, long, value_enum, default_value_t = TriggerArg::Manual)]
        trigger: TriggerArg,
        /// Pisa CERTFLOW_NODE_TIMEOUT_SECS.
        #[arg(long)]
        node_timeout_secs: Option<u64>,
    },
    /// Muestra dominios, emisor y vigencia de un certificado PEM.
    Inspect {
        #[arg(short, long)]
        cert: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TriggerArg {
    Manual,
    Scheduled,
    Webhook,
}

impl From<TriggerArg> for RunTrigger {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::Manual => RunTrigger::Manual,
            TriggerArg::Scheduled => RunTrigger::Scheduled,
            TriggerArg::Webhook => RunTrigger::Webhook,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    let outcome = match cli.command {
        Command::Run { workflow,
                       trigger,
                       node_timeout_secs, } => run_workflow(workflow, trigger.into(), node_timeout_secs).await,
        Command::Inspect { cert } => inspect(cert),
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

async fn run_workflow(path: PathBuf, trigger: RunTrigger, node_timeout_secs: Option<u64>) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(secs) = node_timeout_secs {
        config = config.with_node_timeout(timeout_from_secs("--node-timeout-secs", secs)?);
    }
    let workflow = load_workflow(&path)?;
    let runtime = Runtime::from_config(&config).context("cannot initialize storage")?;
    info!("running workflow '{}' from {} ({:?} backend)", workflow.id, path.display(), runtime.backend());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling run");
            on_signal.cancel();
        }
    });

    let run = runtime.run(&workflow, trigger, cancel).await.context("run could not be recorded")?;
    print_run(&run);
    Ok(if run.status == RunStatus::Succeeded {
           ExitCode::SUCCESS
       } else {
           ExitCode::from(EXIT_RUN_FAILED)
       })
}

fn inspect(path: PathBuf) -> anyhow::Result<ExitCode> {
    let pem = std::fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
    let report = CertificateReport::from_pem(&pem, chrono::Utc::now())?;
    println!("{report}");
    Ok(if report.expired { ExitCode::from(EXIT_RUN_FAILED) } else { ExitCode::SUCCESS })
}

fn print_run(run: &WorkflowRun) {
    println!("run {} [{}] status={}", run.id, run.trigger.as_str(), run.status.as_str());
    if let Some(err) = &run.error {
        println!("  error: {err}");
    }
    for log in &run.logs {
        println!("  node {} ({})", log.node_name, log.node_id);
        for record in &log.records {
            let level = match record.level {
                LogLevel::Debug => "DEBUG",
                LogLevel::Info => "INFO ",
                LogLevel::Warn => "WARN ",
                LogLevel::Error => "ERROR",
            };
            match &record.error {
                Some(e) => println!("    {} {level} {}: {e}", record.time.format("%H:%M:%S"), record.content),
                None => println!("    {} {level} {}", record.time.format("%H:%M:%S"), record.content),
            }
        }
    }
}
