mod config;
mod error;
mod repl;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use runtime::{Agent, AgentEvent, AnthropicBackend, Completion, LocalToolHost, ToolRegistry};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, Overrides};
use error::{Error, Result};
use repl::{Input, LineReader};

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const MODEL_ENV: &str = "SKIFF_MODEL";

type LocalAgent = Agent<AnthropicBackend, LocalToolHost>;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "A small tool-using AI agent for your terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to a config file (defaults to ./skiff.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model to use (overrides SKIFF_MODEL and the config file)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Maximum model calls per request, 0 for unbounded
    #[arg(long, global = true)]
    max_cycles: Option<usize>,

    /// Directory the tools operate in
    #[arg(short = 'C', long, global = true)]
    workdir: Option<PathBuf>,

    /// Show debug logs and token usage
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Chat,
    /// Resolve a single request and exit
    Ask {
        /// The request text
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
    },
    /// List the tools offered to the model
    Tools {
        /// Print the full JSON specs
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let Cli { command, global } = Cli::parse();
    init_tracing(global.verbose);

    match command {
        Some(Commands::Tools { json }) => cmd_tools(json),
        Some(Commands::Ask { request }) => cmd_ask(&global, &request.join(" ")).await,
        Some(Commands::Chat) | None => cmd_chat(&global).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "cli=debug,runtime=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn api_key_from_env() -> Result<String> {
    api_key(std::env::var(API_KEY_ENV).ok())
}

/// A missing or blank key is fatal.
fn api_key(value: Option<String>) -> Result<String> {
    value
        .filter(|key| !key.trim().is_empty())
        .ok_or(Error::MissingApiKey)
}

/// Build the agent from flags, environment, and config file, in that order
/// of precedence.
fn build_agent(args: &GlobalArgs) -> Result<LocalAgent> {
    let config = Config::discover(args.config.as_deref())?;
    let api_key = api_key_from_env()?;

    let overrides = Overrides {
        model: args.model.clone(),
        max_cycles: args.max_cycles,
        working_dir: args.workdir.clone(),
    };
    let settings = config.settings(overrides, std::env::var(MODEL_ENV).ok());

    let mut builder =
        AnthropicBackend::builder(api_key, settings.model).max_tokens(config.backend.max_tokens);
    if let Some(system) = &config.backend.system {
        builder = builder.system(system);
    }
    if let Some(endpoint) = &config.backend.endpoint {
        builder = builder.endpoint(endpoint);
    }

    let working_dir = match settings.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    tracing::debug!(
        working_dir = %working_dir.display(),
        cycle_limit = ?settings.cycle_limit,
        "agent configured"
    );

    Ok(Agent::new(builder.build(), LocalToolHost::new(working_dir))
        .with_max_cycles(settings.cycle_limit))
}

async fn cmd_chat(args: &GlobalArgs) -> Result<()> {
    println!("skiff v{}", env!("CARGO_PKG_VERSION"));
    let agent = build_agent(args)?;

    println!("Model: {}", agent.backend().model());
    println!("Working directory: {}", agent.tools().working_dir().display());
    println!("Type 'quit' or 'exit' to end.\n");

    let mut lines = LineReader::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let line = match lines.next(repl::ctrl_c()).await? {
            Input::Line(line) => line,
            Input::Eof | Input::Interrupted => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_quit(input) {
            break;
        }

        match resolve(&agent, input).await {
            Ok(completion) => report(&completion, args.verbose),
            Err(e) => eprintln!("\nError: {e}\n"),
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn cmd_ask(args: &GlobalArgs, request: &str) -> Result<()> {
    let agent = build_agent(args)?;
    let completion = resolve(&agent, request).await?;
    report(&completion, args.verbose);
    Ok(())
}

fn cmd_tools(json: bool) -> Result<()> {
    let registry = ToolRegistry::builtin();
    if json {
        println!("{}", serde_json::to_string_pretty(registry.specs())?);
        return Ok(());
    }

    for spec in registry.specs() {
        println!("{:<12}  {}", spec.name, spec.description);
    }
    Ok(())
}

/// Run one request to completion. Ctrl-C cancels the request, not the
/// session.
async fn resolve(agent: &LocalAgent, request: &str) -> runtime::Result<Completion> {
    println!("\nAgent thinking about: '{request}'...");

    let cancel = CancellationToken::new();
    let run = agent.run_with(request, &cancel, print_event);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\nCancelling request...");
            cancel.cancel();
            run.await
        }
    }
}

fn print_event(event: AgentEvent<'_>) {
    match event {
        AgentEvent::ToolCall { call } => {
            println!("Using tool: '{}' with input: {}", call.name, call.input);
        }
        AgentEvent::ToolResult { call, outcome } if outcome.is_error() => {
            println!("  '{}' reported: {}", call.name, first_line(outcome.content()));
        }
        AgentEvent::ModelCall { cycle } => {
            tracing::debug!(cycle, "waiting for model");
        }
        AgentEvent::ToolResult { .. } | AgentEvent::Finished { .. } => {}
    }
}

fn report(completion: &Completion, verbose: bool) {
    println!("\nAgent finished: {}\n", completion.answer);
    if verbose {
        println!(
            "[{} model calls, {} input / {} output tokens]\n",
            completion.cycles, completion.usage.input_tokens, completion.usage.output_tokens
        );
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}
