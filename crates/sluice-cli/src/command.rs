//! Command implementations.

use std::path::Path;

use anyhow::Context;
use sluice_runtime::definition::PipelineDefinition;
use sluice_runtime::pipeline::Pipeline;

use crate::TRACING_TARGET_COMMAND;
use crate::config::{DefinitionArgs, RunArgs};

/// Runs the pipeline and prints its final outputs.
pub fn run(args: &RunArgs) -> anyhow::Result<()> {
    let mut definition = load(&args.source.definition)?;
    if let Some(dir) = &args.checkpoint_dir {
        definition = definition.with_checkpoint_dir(dir);
    }
    if let Some(dir) = &args.pipe_log_dir {
        definition = definition.with_log_dir(dir);
    }

    let mut pipeline = build(&definition)?;
    let outputs = pipeline.run().context("pipeline run failed")?;

    let rendered = if args.compact {
        serde_json::to_string(&outputs)
    } else {
        serde_json::to_string_pretty(&outputs)
    }
    .context("failed to serialize final outputs")?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        outputs = outputs.len(),
        "pipeline finished"
    );
    println!("{rendered}");
    Ok(())
}

/// Builds the pipeline and checks that it can be resolved.
pub fn validate(args: &DefinitionArgs) -> anyhow::Result<()> {
    let definition = load(&args.definition)?;
    let pipeline = build(&definition)?;
    pipeline.validate().context("pipeline is not runnable")?;

    println!(
        "{}: {} pipes, raw inputs [{}], final outputs [{}]",
        args.definition.display(),
        pipeline.pipes().len(),
        pipeline.inferred_raw_inputs().join(", "),
        pipeline.inferred_final_outputs().join(", "),
    );
    Ok(())
}

/// Prints the pipeline diagram.
pub fn graph(args: &DefinitionArgs) -> anyhow::Result<()> {
    let definition = load(&args.definition)?;
    let pipeline = build(&definition)?;
    print!("{}", pipeline.to_dot());
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<PipelineDefinition> {
    PipelineDefinition::from_path(path)
        .with_context(|| format!("failed to load pipeline definition {}", path.display()))
}

fn build(definition: &PipelineDefinition) -> anyhow::Result<Pipeline> {
    let pipeline = definition.build().context("invalid pipeline definition")?;
    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        pipes = pipeline.pipes().len(),
        raw_inputs = ?pipeline.inferred_raw_inputs(),
        final_outputs = ?pipeline.inferred_final_outputs(),
        "pipeline built"
    );
    Ok(pipeline)
}
