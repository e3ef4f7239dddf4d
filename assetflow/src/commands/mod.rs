use anyhow::{Context, Result};
use assetflow::config::{load_pipeline, DEFAULT_CONFIG_FILE};
use assetflow::pipeline::{Pipeline, ProjectLayout};
use clap::{ArgAction, Args, ValueEnum};
use std::path::PathBuf;

pub mod build;
pub mod clean;
pub mod manifest;
pub mod plan;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Options shared by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Project root the pipeline's paths are relative to
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Pipeline file (defaults to assetflow.toml in the project root)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl GlobalArgs {
    /// The project root as an absolute path, so tools with their own
    /// working directory still receive usable paths.
    pub fn root(&self) -> Result<PathBuf> {
        if self.root.is_absolute() {
            return Ok(self.root.clone());
        }
        let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
        Ok(cwd.join(&self.root))
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(self.root()?.join(DEFAULT_CONFIG_FILE)),
        }
    }

    pub async fn pipeline(&self) -> Result<Pipeline> {
        let path = self.config_path()?;
        Ok(load_pipeline(&path).await?)
    }

    pub fn layout(&self, pipeline: &Pipeline) -> Result<ProjectLayout> {
        Ok(ProjectLayout::new(
            self.root()?,
            pipeline.scratch_dir(),
            pipeline.output_dir(),
        ))
    }
}
