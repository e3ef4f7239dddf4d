use super::GlobalArgs;
use anyhow::{bail, Context, Result};
use assetflow::manifest::Manifest;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Print the manifest as JSON
    #[arg(long)]
    pub json: bool,

    /// Compare with a manifest saved by `manifest --json` and list the paths that differ
    #[arg(long, value_name = "FILE")]
    pub diff: Option<PathBuf>,
}

pub async fn run(args: &ManifestArgs, global: &GlobalArgs) -> Result<()> {
    let pipeline = global.pipeline().await?;
    let manifest = Manifest::collect(&global.layout(&pipeline)?).await?;

    if let Some(saved) = &args.diff {
        return diff(&manifest, saved, args.json).await;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        print!("{}", manifest.render());
    }
    Ok(())
}

async fn diff(manifest: &Manifest, saved: &Path, json: bool) -> Result<()> {
    let text = tokio::fs::read_to_string(saved)
        .await
        .with_context(|| format!("Cannot read manifest {}", saved.display()))?;
    let other: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a manifest written by `manifest --json`", saved.display()))?;

    let changed = manifest.diff(&other);
    if json {
        println!("{}", serde_json::to_string_pretty(&changed)?);
    } else if changed.is_empty() {
        println!("No differences from {}", saved.display());
    } else {
        for path in &changed {
            println!("{path}");
        }
    }

    if !changed.is_empty() {
        bail!("{} file(s) differ from {}", changed.len(), saved.display());
    }
    Ok(())
}
