use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gen_cli::app::{collect_prompt, list_models, App, DEFAULT_MODEL};
use gen_cli::catalog::Catalog;
use gen_cli::models::{Config, LogVerbosity, OutputFormat};
use gen_cli::settings::Settings;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const API_ENDPOINT_ENV: &str = "GEN_API_ENDPOINT";

#[derive(Debug, Parser)]
#[command(name = "gen", version)]
#[command(about = "Generate content with models hosted on Vertex AI")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Google Cloud project ID
    #[arg(long, global = true, env = "PROJECT_ID")]
    project: Option<String>,

    /// Google Cloud region
    #[arg(long, global = true, env = "REGION")]
    region: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Log verbosity
    #[arg(long, global = true, value_enum, default_value_t = LogVerbosity::None)]
    log: LogVerbosity,

    /// YAML settings file (project_id, region)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prompt a model
    #[command(alias = "p")]
    Prompt {
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,

        /// JSON model parameter file
        #[arg(short, long, value_name = "PARAMFILE")]
        config: Option<PathBuf>,

        /// Read the prompt from a file
        #[arg(short, long, value_name = "PROMPTFILE")]
        file: Option<PathBuf>,

        /// Print chunks as they arrive (Gemini only)
        #[arg(long)]
        stream: bool,

        prompt: Vec<String>,
    },

    /// Interactive mode
    #[command(alias = "i")]
    Interactive {
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,

        /// JSON model parameter file
        #[arg(short, long, value_name = "PARAMFILE")]
        config: Option<PathBuf>,
    },

    /// List known models
    #[command(alias = "m")]
    Models,

    /// Count tokens for a prompt (Gemini models only)
    #[command(visible_alias = "t", aliases = ["count", "tokencount", "tc"])]
    Tokens {
        #[arg(short, long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Read the prompt from a file
        #[arg(short, long, value_name = "PROMPTFILE")]
        file: Option<PathBuf>,

        prompt: Vec<String>,
    },

    /// Print the version
    Version,
}

impl Command {
    fn parameter_file(&self) -> Option<&PathBuf> {
        match self {
            Command::Prompt { config, .. } | Command::Interactive { config, .. } => config.as_ref(),
            _ => None,
        }
    }

    fn stream(&self) -> bool {
        matches!(self, Command::Prompt { stream: true, .. })
    }
}

fn init_tracing(verbosity: LogVerbosity) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| verbosity.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_config(cli: &Cli) -> Result<Config> {
    let settings = match &cli.global.settings {
        Some(path) => Settings::from_path(path)?,
        None => Settings::discover()?,
    };
    let (project, region) = settings.fill(cli.global.project.clone(), cli.global.region.clone());

    let mut builder = Config::builder()
        .project_id(project.unwrap_or_default())
        .output_format(cli.global.output)
        .log_verbosity(cli.global.log)
        .stream(cli.command.stream());
    if let Some(region) = region {
        builder = builder.region_id(region);
    }
    if let Some(path) = cli.command.parameter_file() {
        builder = builder.config_file(path);
    }
    if let Ok(endpoint) = std::env::var(API_ENDPOINT_ENV) {
        builder = builder.api_endpoint(endpoint);
    }

    let config = builder
        .build()
        .context("set --project, PROJECT_ID, or project_id in the settings file")?;
    debug!("Model config: {:?}", config);
    Ok(config)
}

async fn run(cli: Cli, ctx: CancellationToken) -> Result<()> {
    let mut stdout = std::io::stdout();

    // Neither listing models nor the version needs a project.
    match cli.command {
        Command::Models => {
            list_models(&Catalog::embedded()?, cli.global.output, &mut stdout)?;
            return Ok(());
        }
        Command::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        _ => {}
    }

    let app = App::new(build_config(&cli)?)?;

    match cli.command {
        Command::Prompt {
            model, file, prompt, ..
        } => {
            let prompt = collect_prompt(prompt, file.as_deref()).await?;
            app.prompt(&ctx, &model, &prompt, &mut stdout).await?;
        }
        Command::Interactive { model, .. } => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            app.interactive(&ctx, &model, stdin, &mut stdout).await?;
        }
        Command::Tokens {
            model, file, prompt,
        } => {
            let prompt = collect_prompt(prompt, file.as_deref()).await?;
            app.count_tokens(&ctx, &model, &prompt, &mut stdout).await?;
        }
        Command::Models | Command::Version => {}
    }
    Ok(())
}

fn version_line() -> String {
    format!("gen {}", env!("CARGO_PKG_VERSION"))
}

fn exit_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.global.log);

    let ctx = CancellationToken::new();
    let on_interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let code = exit_code(&run(cli, ctx).await);
    // A stdin read parked on the blocking pool would hold up runtime shutdown.
    std::process::exit(code);
}
