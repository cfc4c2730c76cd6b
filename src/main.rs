use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use taskpipe::cli::commands::{AgentsCommand, RunCommand, ValidateCommand};
use taskpipe::cli::output::*;
use taskpipe::cli::{Cli, Command};
use taskpipe::core::config::PipelineConfig;
use taskpipe::execution::{ApprovalHandler, AutoApprove, EventHandler, RunEvent};
use taskpipe::{AgentRegistry, PipelineRunner, RunOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG still wins when set
    let default_filter = if cli.verbose { "taskpipe=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Agents(cmd) => list_agents(cmd).await?,
    }

    Ok(())
}

/// Prompts on the terminal for gate approval
struct ConsoleApproval;

#[async_trait]
impl ApprovalHandler for ConsoleApproval {
    async fn approve(&self, _step_id: &str, message: &str) -> bool {
        let prompt = format!("{} {} [y/N] ", GATE, message);
        let answer = tokio::task::spawn_blocking(move || {
            let term = console::Term::stderr();
            if term.write_str(&prompt).is_err() {
                return None;
            }
            term.read_line().ok()
        })
        .await;

        match answer {
            Ok(Some(line)) => {
                let line = line.trim().to_lowercase();
                line == "y" || line == "yes"
            }
            _ => false,
        }
    }
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config =
        PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline definition")?;
    let pipeline = config
        .to_pipeline()
        .context("Invalid pipeline definition")?;

    if !cmd.json {
        println!(
            "{} Loaded pipeline: {} ({} steps)",
            INFO,
            style(&pipeline.name).bold(),
            style(pipeline.steps.len()).cyan()
        );
        for (key, value) in &cmd.variable {
            println!(
                "{} Variable override: {} = {}",
                INFO,
                style(key).cyan(),
                style(value).dim()
            );
        }
    }

    let registry = Arc::new(AgentRegistry::with_builtins());

    let mut runner = PipelineRunner::new(registry);
    if !cmd.json {
        let handler: EventHandler = Arc::new(|event: RunEvent| {
            println!("{}", format_run_event(&event));
        });
        runner = runner.with_event_handler(handler);
    }
    runner = if cmd.yes || cmd.json {
        runner.with_approval_handler(Arc::new(AutoApprove))
    } else {
        runner.with_approval_handler(Arc::new(ConsoleApproval))
    };

    let options = RunOptions {
        variables: cmd
            .variable
            .iter()
            .cloned()
            .collect::<HashMap<String, String>>(),
        project_root: PathBuf::from(&cmd.project_root),
        strict_vars: cmd.strict_vars,
    };

    let result = runner
        .run(&pipeline, options)
        .await
        .context("Pipeline run failed to start")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        for step_result in &result.step_results {
            println!("{}", format_step_result(step_result));
        }
        if !result.artifacts.files.is_empty() {
            println!("\n{} Files touched:", INFO);
            for file in &result.artifacts.files {
                println!("  {}", style(file).cyan());
            }
        }
        if result.success {
            println!(
                "\n{} {} completed {} in {}ms",
                CHECK,
                style(&result.pipeline_name).bold(),
                style("successfully").green(),
                result.total_duration_ms
            );
        } else {
            let error = result.error.as_deref().unwrap_or("unknown error");
            println!(
                "\n{} {} {}: {}",
                CROSS,
                style(&result.pipeline_name).bold(),
                style("failed").red(),
                error
            );
        }
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    let outcome = PipelineConfig::from_file(&cmd.file).and_then(|config| config.to_pipeline());

    match outcome {
        Ok(pipeline) => {
            if cmd.json {
                let data = serde_json::json!({
                    "valid": true,
                    "name": pipeline.name,
                    "steps": pipeline.steps.iter().map(|s| &s.id).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Pipeline definition is valid", CHECK);
                println!("  Name: {}", style(&pipeline.name).bold());
                println!("  Steps: {}", style(pipeline.steps.len()).cyan());
                println!("  Variables: {}", style(pipeline.variables.len()).cyan());
            }
            Ok(())
        }
        Err(e) => {
            if cmd.json {
                let data = serde_json::json!({ "valid": false, "error": e.to_string() });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{} Validation failed:", CROSS);
                println!("  {}", style(&e).red());
            }
            std::process::exit(1);
        }
    }
}

async fn list_agents(cmd: &AgentsCommand) -> Result<()> {
    let registry = AgentRegistry::with_builtins();

    if cmd.json {
        let mut data = Vec::new();
        for agent in registry.all() {
            let available = agent.check_availability().await;
            let version = if available { agent.version().await } else { None };
            data.push(serde_json::json!({
                "name": agent.name(),
                "available": available,
                "version": version,
                "priority": agent.routing().priority,
                "capabilities": agent.capabilities(),
            }));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "agents": data }))?
        );
        return Ok(());
    }

    println!("{} Registered agents:", INFO);
    for agent in registry.all() {
        let available = agent.check_availability().await;
        let status = if available {
            style("available").green().to_string()
        } else {
            style("not found").dim().to_string()
        };
        let version = if available {
            agent.version().await
        } else {
            None
        };

        match version {
            Some(version) => println!(
                "  {} ({}) - {} - {}",
                style(agent.name()).bold(),
                style(agent.routing().priority).cyan(),
                status,
                style(version).dim()
            ),
            None => println!(
                "  {} ({}) - {}",
                style(agent.name()).bold(),
                style(agent.routing().priority).cyan(),
                status
            ),
        }
    }

    Ok(())
}
