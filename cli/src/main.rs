//! CLI entrypoint for toolflow
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod events;

use anyhow::{Context, Result, bail};
use clap::Parser;
use commands::{Cli, Command, RunArgs};
use events::LogEvents;
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use toolflow_application::{
    PipelineEventNotifier, PipelineService, PlanExecutor, SubmitOptions, SubmitOutcome,
};
use toolflow_domain::{ConfigIssue, PipelineResult, Priority, has_errors, parse_plan};
use toolflow_infrastructure::{
    ConfigLoader, FileConfig, FileLoggingConfig, JsonlAuditSink, SharedSecretVerifier,
    builtin_registry, build_router,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const ELEVATED_PROOF_ENV: &str = "TOOLFLOW_ELEVATED_PROOF";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };

    let _log_guard = init_tracing(cli.verbose, &config.logging)?;
    info!("Starting toolflow");

    let issues = config.validate();

    match cli.command {
        Command::Config => {
            show_config(&cli, &config, &issues)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Tools { json } => {
            check_issues(&issues)?;
            show_tools(&config, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan { execute, json } => {
            check_issues(&issues)?;
            plan_from_stdin(&config, execute, json).await
        }
        Command::Run(args) => {
            check_issues(&issues)?;
            run_request(&config, args).await
        }
    }
}

/// Initialize logging based on verbosity level, `RUST_LOG` and `[logging]`
fn init_tracing(verbose: u8, logging: &FileLoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = logging.level.as_deref().unwrap_or("warn");
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
        }),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn check_issues(issues: &[ConfigIssue]) -> Result<()> {
    for issue in issues {
        eprintln!("{}", issue);
    }
    if has_errors(issues) {
        bail!("Invalid configuration; run `toolflow config` for details");
    }
    Ok(())
}

// === Dependency Injection ===
fn build_service(config: &FileConfig) -> Result<Arc<PipelineService>> {
    let events: Arc<dyn PipelineEventNotifier> = Arc::new(LogEvents);

    let registry = builtin_registry(&config.executor.builtin_tools())
        .context("Failed to register built-in tools")?;
    let mut executor = PlanExecutor::new(Arc::new(registry), config.executor.to_params())
        .with_events(Arc::clone(&events));

    if let Some(verifier) = config
        .auth
        .resolve_secret()
        .and_then(SharedSecretVerifier::new)
    {
        executor = executor.with_auth_verifier(Arc::new(verifier));
    }

    if config.audit.enabled {
        let sink = JsonlAuditSink::open(&config.audit.path).with_context(|| {
            format!("Failed to open audit log {}", config.audit.path.display())
        })?;
        info!(path = %sink.path().display(), "Audit log enabled");
        executor = executor.with_audit_sink(Arc::new(sink));
    }

    let router = build_router(&config.router)?.with_events(Arc::clone(&events));

    Ok(Arc::new(
        PipelineService::new(
            Arc::new(executor),
            Arc::new(router),
            config.pipeline.to_params(),
        )
        .with_events(events),
    ))
}

async fn run_request(config: &FileConfig, args: RunArgs) -> Result<ExitCode> {
    if config.router.backends.is_empty() {
        bail!("No model backends configured; add a [[router.backends]] entry");
    }

    let priority = match &args.priority {
        Some(p) => p.parse::<Priority>()?,
        None => config.pipeline.parse_priority().0,
    };

    let mut options = SubmitOptions::default()
        .with_priority(priority)
        .with_scopes(args.scopes)
        .with_best_effort(args.best_effort || config.pipeline.best_effort);
    if let Some(session) = args.session {
        options = options.with_session(session);
    }
    if !args.allow.is_empty() {
        options = options.with_allowlist(args.allow);
    }
    if args.stop_on_failure {
        options = options.with_stop_on_failure(true);
    }
    if args.elevated {
        let proof = std::env::var(ELEVATED_PROOF_ENV)
            .with_context(|| format!("--elevated requires ${}", ELEVATED_PROOF_ENV))?;
        options = options.with_elevated_proof(proof);
    }

    let service = build_service(config)?;
    let outcome = service.submit_request(&args.request, options).await?;
    report(outcome, args.json)
}

async fn plan_from_stdin(config: &FileConfig, execute: bool, json: bool) -> Result<ExitCode> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read plan from stdin")?;

    let Some(plan) = parse_plan(&input) else {
        println!("no plan");
        return Ok(ExitCode::FAILURE);
    };

    println!("{}", serde_json::to_string_pretty(&plan)?);
    if !execute {
        return Ok(ExitCode::SUCCESS);
    }

    let service = build_service(config)?;
    let outcome = service
        .submit_plan(plan.into_steps(), SubmitOptions::default())
        .await?;
    report(outcome, json)
}

fn report(outcome: SubmitOutcome, json: bool) -> Result<ExitCode> {
    let Some(result) = outcome.into_result() else {
        bail!("Execution did not complete");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_result(result: &PipelineResult) {
    let mark = if result.success { "ok" } else { "FAILED" };
    println!("Execution {} {}", result.execution_id, mark);
    if let Some(backend) = &result.metadata.planned_by {
        println!(
            "Planned by {} ({} tokens, cost {:.6})",
            backend, result.metadata.planning_tokens, result.metadata.planning_cost
        );
    }

    for (i, step) in result.steps.iter().enumerate() {
        let status = if step.success { "ok" } else { "failed" };
        println!("[{}] {} {} ({}ms)", i + 1, step.tool, status, step.latency_ms);
        match (&step.output, &step.error) {
            (Some(serde_json::Value::String(text)), _) => println!("{}", text),
            (Some(value), _) => println!("{}", value),
            (None, Some(err)) => match step.error_code() {
                Some(code) => println!("  {}: {}", code.as_str(), err),
                None => println!("  {}", err),
            },
            (None, None) => {}
        }
    }

    if let Some(error) = &result.error {
        println!("Error: {}", error);
    }
}

fn show_tools(config: &FileConfig, json: bool) -> Result<()> {
    let registry = builtin_registry(&config.executor.builtin_tools())?;
    let tools = registry.describe();

    if json {
        let described: Vec<_> = tools.iter().map(|t| t.to_prompt_json()).collect();
        println!("{}", serde_json::to_string_pretty(&described)?);
        return Ok(());
    }

    for tool in &tools {
        let elevated = if tool.requires_elevated_auth {
            " [elevated]"
        } else {
            ""
        };
        println!(
            "{:<16} {:<13} {}{}",
            tool.name,
            tool.execution_class.as_str(),
            tool.description,
            elevated
        );
    }
    Ok(())
}

fn show_config(cli: &Cli, config: &FileConfig, issues: &[ConfigIssue]) -> Result<()> {
    if cli.no_config {
        println!("Configuration files disabled (--no-config)");
    } else {
        for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("{}", line);
        }
    }

    println!();
    if issues.is_empty() {
        println!("No configuration issues.");
    } else {
        println!("Issues:");
        for issue in issues {
            println!("  {}", issue);
        }
    }

    println!();
    println!("Effective configuration:");
    println!("{}", toml::to_string_pretty(&redacted(config))?);
    Ok(())
}

/// Copy of `config` safe to print.
fn redacted(config: &FileConfig) -> FileConfig {
    const HIDDEN: &str = "<redacted>";
    let mut config = config.clone();
    if config.auth.secret.is_some() {
        config.auth.secret = Some(HIDDEN.to_string());
    }
    for backend in &mut config.router.backends {
        if backend.api_key.is_some() {
            backend.api_key = Some(HIDDEN.to_string());
        }
    }
    config
}
