use super::GlobalArgs;
use anyhow::Result;
use assetflow::core::BuildMode;
use assetflow::pipeline::{Pipeline, PlanEntry};
use assetflow::utils::to_slash;
use clap::Args;
use std::fmt::Write as _;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Mode to plan for (build or dev)
    #[arg(long, default_value = "build")]
    pub mode: BuildMode,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let pipeline = global.pipeline().await?;
    let plan = pipeline.plan(args.mode);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render(&pipeline, args.mode, &plan));
    }
    Ok(())
}

fn render(pipeline: &Pipeline, mode: BuildMode, plan: &[PlanEntry]) -> String {
    let mut out = String::new();
    let active = plan.iter().filter(|entry| entry.active).count();
    let _ = writeln!(
        out,
        "{} ({mode}): {active} of {} stages, scratch '{}', output '{}'",
        pipeline.name(),
        plan.len(),
        to_slash(pipeline.scratch_dir()),
        to_slash(pipeline.output_dir()),
    );

    for entry in plan {
        let marker = if entry.active { ' ' } else { '-' };
        let _ = write!(out, "{marker}{:>3}. {:<24} {:<15}", entry.index + 1, entry.name, entry.kind.as_str());
        if let Some(program) = &entry.program {
            let _ = write!(out, " [{program}]");
        }
        if !entry.depends_on.is_empty() {
            let _ = write!(out, " after {}", entry.depends_on.join(", "));
        }
        if entry.releases_scratch {
            let _ = write!(out, " (then removes scratch)");
        }
        out.push('\n');
    }
    out
}
