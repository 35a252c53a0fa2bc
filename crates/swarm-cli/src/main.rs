use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use swarm_core::codec::decode_body;
use swarm_core::domain::task::POST_URL_BASE;
use swarm_core::domain::{HandlerError, Provenance, TaskDescriptor, TaskSpec};
use swarm_core::impls::MoltbookClient;
use swarm_core::observability::{DEFAULT_FILTER, init_tracing};
use swarm_core::{NodeBuilder, Skill, SkillHandler, SwarmConfig, TaskPublisher};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Parser)]
#[command(name = "swarm", version, about = "MoltSwarm worker node")]
struct Cli {
    /// Config file (default: config.yaml, config.yml, ~/.config/moltswarm/config.yaml, then env)
    #[arg(short, long, global = true, env = "SWARM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the worker node with the built-in echo skill.
    Run {
        /// Run a single iteration and exit.
        #[arg(long)]
        once: bool,
    },

    /// Publish a new task.
    Publish(PublishArgs),

    /// Decode a post body from FILE (or stdin) and print the task as JSON.
    Decode { file: Option<PathBuf> },
}

#[derive(Debug, Args)]
struct PublishArgs {
    #[arg(long)]
    title: String,

    /// Required capability tag; repeatable.
    #[arg(long = "skill", required = true)]
    skills: Vec<String>,

    /// Claim timeout in seconds.
    #[arg(long, default_value_t = 3600)]
    timeout: i64,

    /// ISO-8601 deadline.
    #[arg(long)]
    deadline: Option<String>,

    #[arg(long, default_value = "")]
    description: String,

    /// Requirement line; repeatable.
    #[arg(long = "requirement")]
    requirements: Vec<String>,

    #[arg(long = "type", default_value = "code")]
    task_type: String,

    #[arg(long, default_value = "")]
    output_format: String,

    #[arg(long, default_value = "")]
    validation: String,

    /// Do not offer a karma upvote.
    #[arg(long)]
    no_reward: bool,

    /// Community to post into (default from config).
    #[arg(long)]
    community: Option<String>,
}

/// Answers every task with a summary of what was asked.
struct EchoHandler;

#[async_trait]
impl SkillHandler for EchoHandler {
    async fn handle(&self, task: &TaskDescriptor) -> Result<String, HandlerError> {
        let mut out = format!("Received task: {}\n", task.title());
        if !task.description().is_empty() {
            out.push_str(&format!("\n{}\n", task.description()));
        }
        for requirement in task.requirements() {
            out.push_str(&format!("- {requirement}\n"));
        }
        Ok(out)
    }
}

fn load_config(path: Option<&PathBuf>) -> CliResult<SwarmConfig> {
    let config = match path {
        Some(path) => SwarmConfig::from_file(path)?,
        None => SwarmConfig::auto_load()?,
    };
    Ok(config)
}

async fn run(config: SwarmConfig, once: bool) -> CliResult {
    let skill = Skill::new("echo", EchoHandler)
        .with_description("Echoes the task back")
        .with_tags(config.node.skills.clone());

    let node = NodeBuilder::from_config(&config)?.register_skill(skill).build()?;

    if once {
        let report = node.worker().run_once().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let handle = node.start().await;
    tokio::signal::ctrl_c().await?;
    info!("ctrl-c received, finishing current iteration");
    handle.shutdown_and_join().await;
    Ok(())
}

async fn publish(config: SwarmConfig, args: PublishArgs) -> CliResult {
    let client = MoltbookClient::from_config(&config.moltbook)?;
    let publisher = TaskPublisher::new(Arc::new(client))
        .with_community(args.community.unwrap_or(config.node.community));

    let mut spec = TaskSpec::new("", args.timeout);
    spec.task_type = args.task_type;
    spec.skills = args.skills;
    spec.reward_karma = !args.no_reward;
    spec.deadline = args.deadline;
    spec.title = args.title;
    spec.description = args.description;
    spec.requirements = args.requirements;
    spec.output_format = args.output_format;
    spec.validation = args.validation;

    let published = publisher.publish(spec).await?;
    println!("job_id: {}", published.job_id);
    println!("post_id: {}", published.post_id);
    println!("url: {POST_URL_BASE}/{}", published.post_id);
    Ok(())
}

fn decode(file: Option<PathBuf>) -> CliResult {
    let body = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let task = decode_body(&body, Provenance::default())?;
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}

async fn dispatch(cli: Cli) -> CliResult {
    match cli.command {
        Command::Run { once } => run(load_config(cli.config.as_ref())?, once).await,
        Command::Publish(args) => publish(load_config(cli.config.as_ref())?, args).await,
        Command::Decode { file } => decode(file),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing(DEFAULT_FILTER);
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
