//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for toolflow
#[derive(Parser, Debug)]
#[command(name = "toolflow")]
#[command(author, version, about = "Policy-gated tool-use orchestration for language-model plans")]
#[command(long_about = r#"
toolflow turns a natural-language request into a tool plan with a language
model, validates the plan, and runs each step through a policy-gated executor.

Model output never reaches a tool directly: a response that does not parse
into a valid plan fails the request and no step runs.

Configuration files are loaded from (in priority order):
1. TOOLFLOW_* environment variables (e.g. TOOLFLOW_PIPELINE__MAX_CONCURRENT=8)
2. --config <path>     Explicit config file
3. ./toolflow.toml     Project-level config
4. ~/.config/toolflow/config.toml   Global config

Example:
  toolflow run "read the file notes.txt"
  toolflow run --priority high --allow read_file --json "summarize notes.txt"
  echo '{"steps":[{"tool":"read_file","args":{"path":"a.txt"}}]}' | toolflow plan
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files and environment overrides
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan a request with the model and execute the plan
    Run(RunArgs),

    /// Validate a plan read from stdin and print it (or "no plan")
    Plan {
        /// Also run the validated plan as a trusted plan
        #[arg(long)]
        execute: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the registered tools
    Tools {
        /// Print full tool descriptions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration sources, issues and effective values
    Config,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// The request to plan and execute
    pub request: String,

    /// Queue priority: low, normal, high
    #[arg(short, long, value_name = "PRIORITY")]
    pub priority: Option<String>,

    /// Session identifier recorded in results and audit records
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,

    /// Restrict execution to these tools (can be specified multiple times)
    #[arg(long = "allow", value_name = "TOOL")]
    pub allow: Vec<String>,

    /// Scopes granted to this run (can be specified multiple times)
    #[arg(long = "scope", value_name = "SCOPE")]
    pub scopes: Vec<String>,

    /// Present $TOOLFLOW_ELEVATED_PROOF as proof for elevated tools
    #[arg(long)]
    pub elevated: bool,

    /// Succeed if at least one step succeeds
    #[arg(long)]
    pub best_effort: bool,

    /// Stop at the first failed step
    #[arg(long)]
    pub stop_on_failure: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}
