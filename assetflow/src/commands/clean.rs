use super::GlobalArgs;
use anyhow::Result;
use assetflow::pipeline::PipelineRunner;

pub async fn run(global: &GlobalArgs) -> Result<()> {
    let pipeline = global.pipeline().await?;
    let runner = PipelineRunner::new(pipeline, global.root()?);

    let removed = runner.clean().await?;
    if removed.is_empty() {
        println!("Nothing to clean in {}", runner.layout().output_dir().display());
    }
    for path in removed {
        println!("removed {}", runner.layout().display(&path));
    }
    Ok(())
}
