use super::GlobalArgs;
use anyhow::Result;
use assetflow::core::BuildMode;
use assetflow::events::LoggingEventSink;
use assetflow::pipeline::PipelineRunner;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Runs the pipeline. The report is printed whether or not the run succeeds.
pub async fn run(mode: BuildMode, args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let pipeline = global.pipeline().await?;
    let runner = PipelineRunner::new(pipeline, global.root()?)
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    match runner.run(mode).await {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.summary());
            }
            Ok(())
        }
        Err(failure) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&failure.report)?);
            } else {
                println!("{}", failure.report.summary());
            }
            Err(failure.into())
        }
    }
}
