use anyhow::{anyhow, Result};
use assetflow::core::BuildMode;
use assetflow::errors::AssetflowError;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{build, clean, manifest, plan, GlobalArgs, LogFormat};

#[derive(Parser)]
#[command(name = "assetflow")]
#[command(version)]
#[command(about = "Declarative static asset build pipeline runner")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, compile, bundle, minify and compress
    Build(build::RunArgs),
    /// Same as build without the build-only stages
    Dev(build::RunArgs),
    /// Delete the previous output only
    Clean,
    /// Validate the pipeline and print its stages in order
    Plan(plan::PlanArgs),
    /// List the output directory with SHA-256 digests
    Manifest(manifest::ManifestArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(&cli.global) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Commands::Build(args) => build::run(BuildMode::Build, args, &cli.global).await,
        Commands::Dev(args) => build::run(BuildMode::Dev, args, &cli.global).await,
        Commands::Clean => clean::run(&cli.global).await,
        Commands::Plan(args) => plan::run(args, &cli.global).await,
        Commands::Manifest(args) => manifest::run(args, &cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if let Some(hint) = validation_hint(&err) {
                eprintln!("  hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn validation_hint(err: &anyhow::Error) -> Option<String> {
    let AssetflowError::Validation(validation) = err.downcast_ref::<AssetflowError>()? else {
        return None;
    };
    let info = validation.error_info.as_ref()?;
    Some(match &info.fix_hint {
        Some(hint) => format!("[{}] {hint}", info.code),
        None => format!("[{}]", info.code),
    })
}

/// Logs go to stderr so that `--json` output on stdout stays parseable.
fn init_tracing(global: &GlobalArgs) -> Result<()> {
    let filter = if global.verbose > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let registry = tracing_subscriber::registry().with(filter);

    match global.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize tracing: {e}"))
}
