//! Command handlers
//!
//! `run` executes the standard Source → Build → Deploy pipeline against the
//! configured repository and function. `last-deploy` answers the audit
//! question: which version did the last successful run publish?

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use cutover_core::config::PipelineConfig;
use cutover_core::domain::pipeline::Pipeline;
use cutover_core::domain::run::{RunRecord, StageStatus};
use cutover_engine::adapters::github::GithubSourceProvider;
use cutover_engine::adapters::http_host::HttpComputeHost;
use cutover_engine::adapters::memory::MemoryComputeHost;
use cutover_engine::adapters::toolchain::CommandToolchain;
use cutover_engine::adapters::vault::EnvVault;
use cutover_engine::history::RunHistory;
use cutover_engine::orchestrator::PipelineOrchestrator;
use cutover_engine::ports::ComputeHost;
use cutover_engine::stages::{BuildStage, DeployStage, SourceStage};
use cutover_engine::store::MemoryArtifactStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cutover", about = "Release orchestration for serverless functions")]
pub struct Cli {
    /// Path of the NDJSON run-history file
    #[arg(long, env = "CUTOVER_HISTORY", default_value = ".cutover/history.ndjson")]
    pub history: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Source → Build → Deploy pipeline once
    Run {
        /// Owner of the source repository
        #[arg(long, env = "SOURCE_OWNER")]
        owner: String,

        /// Name of the source repository
        #[arg(long, env = "SOURCE_REPO")]
        repo: String,

        /// Function name on the compute host
        #[arg(long, env = "FUNCTION_NAME")]
        function: String,

        /// Branch to build
        #[arg(long, env = "SOURCE_BRANCH", default_value = "main")]
        branch: String,

        /// Traffic-facing alias to cut over
        #[arg(long, env = "ALIAS_NAME", default_value = "live")]
        alias: String,

        /// Git reference to build instead of the branch head
        #[arg(long)]
        git_ref: Option<String>,

        /// Build command; receives CUTOVER_SOURCE_ARCHIVE and
        /// CUTOVER_PACKAGE_PATH in its environment
        #[arg(long, env = "BUILD_COMMAND")]
        build_command: String,

        /// Compute host base URL; without it the run deploys into an
        /// in-memory host (a rehearsal, no real traffic moves)
        #[arg(long, env = "COMPUTE_HOST_URL")]
        host_url: Option<String>,

        /// Per-external-call timeout in seconds
        #[arg(long, env = "STAGE_TIMEOUT", default_value = "300")]
        timeout: u64,
    },
    /// Show the last successful deploy from run history
    LastDeploy,
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let history = RunHistory::new(&cli.history);
    match cli.command {
        Commands::Run {
            owner,
            repo,
            function,
            branch,
            alias,
            git_ref,
            build_command,
            host_url,
            timeout,
        } => {
            let config = PipelineConfig::new(owner, repo, function)
                .with_branch(branch)
                .with_alias_name(alias)
                .with_stage_timeout(Duration::from_secs(timeout));
            config.validate().context("invalid configuration")?;
            run_pipeline(config, git_ref, &build_command, host_url, history).await
        }
        Commands::LastDeploy => last_deploy(history).await,
    }
}

async fn run_pipeline(
    config: PipelineConfig,
    git_ref: Option<String>,
    build_command: &str,
    host_url: Option<String>,
    history: RunHistory,
) -> Result<()> {
    let host: Arc<dyn ComputeHost> = match host_url {
        Some(url) => Arc::new(HttpComputeHost::new(url)),
        None => {
            println!(
                "{}",
                "No compute host configured; deploying into an in-memory host".yellow()
            );
            Arc::new(MemoryComputeHost::new())
        }
    };

    let vault = Arc::new(EnvVault::new());
    let toolchain = CommandToolchain::from_shell(build_command).context("invalid build command")?;

    let source_ref = git_ref.unwrap_or_else(|| config.branch.clone());

    let orchestrator = PipelineOrchestrator::new(
        config,
        Arc::new(MemoryArtifactStore::new()),
        Arc::new(SourceStage::new(Arc::new(GithubSourceProvider::new(vault)))),
        Arc::new(BuildStage::new(Arc::new(toolchain))),
        Arc::new(DeployStage::new(host)),
        history,
    );

    let record = orchestrator.run(&Pipeline::standard(), &source_ref).await?;
    print_run(&record);

    if let Some(stage) = record.failed_stage() {
        bail!("run {} failed at stage '{}'", record.run_id, stage);
    }
    Ok(())
}

async fn last_deploy(history: RunHistory) -> Result<()> {
    match history.last_successful_deploy().await? {
        Some(record) => {
            let deploy = record.deployed.as_ref().expect("successful deploy record");
            println!(
                "{} {} -> {} (run {}, {})",
                "Last deploy:".bold(),
                deploy.alias.green(),
                deploy.version.to_string().green(),
                record.run_id,
                record
                    .finished_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown time".to_string()),
            );
        }
        None => println!("No successful deploy recorded yet"),
    }
    Ok(())
}

fn print_run(record: &RunRecord) {
    println!();
    println!("{} {}", "Run".bold(), record.run_id);

    for outcome in &record.stages {
        match outcome.status {
            StageStatus::Succeeded => {
                println!("  {} {}", "ok".green().bold(), outcome.stage);
            }
            StageStatus::Failed => {
                println!(
                    "  {} {} ({})",
                    "failed".red().bold(),
                    outcome.stage,
                    outcome.error_kind.as_deref().unwrap_or("unknown")
                );
                if let Some(error) = &outcome.error {
                    for line in error.lines() {
                        println!("      {}", line.red());
                    }
                }
            }
        }
    }

    match &record.deployed {
        Some(deploy) => println!(
            "  {} alias '{}' now at {}",
            "deployed".green().bold(),
            deploy.alias,
            deploy.version
        ),
        None => {
            if record.is_success() {
                println!("  {} no deploy stage in pipeline", "note".yellow());
            }
        }
    }
}
