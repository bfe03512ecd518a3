//! Serializable pipeline definitions.
//!
//! A [`PipelineDefinition`] is the JSON form of a pipeline: its pipes with
//! their codenames, options and tagged steps, plus the raw input values.
//!
//! ```json
//! {
//!   "pipes": [
//!     {
//!       "name": "Load",
//!       "inputs": "source",
//!       "outputs": "scents",
//!       "steps": [{"type": "extract_csv"}, {"type": "assign_uids", "uid_column": "uid"}]
//!     }
//!   ],
//!   "raw_inputs": {"source": "data/scents.csv"}
//! }
//! ```

mod step;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sluice_core::DataMap;
pub use step::{
    AssignUidsStep, CheckpointStep, CompareStep, FeaturizeStep, HeaderMapStep, MergeStep,
    NestedPipe, NormalizeStep, StepDefinition,
};

use crate::TRACING_TARGET_PIPELINE;
use crate::error::{PipelineError, PipelineResult};
use crate::operator::FeatureRegistry;
use crate::pipe::PipeConfig;
use crate::pipeline::{Codenames, Pipeline};

/// A pipe of a [`PipelineDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeDefinition {
    /// Pipe options.
    #[serde(flatten)]
    pub config: PipeConfig,
    /// Consumed codenames.
    #[serde(default)]
    pub inputs: Codenames,
    /// Produced codenames.
    pub outputs: Codenames,
    /// Steps in application order.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// Serializable description of a [`Pipeline`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Pipes in declaration order.
    pub pipes: Vec<PipeDefinition>,
    /// Values of the raw inputs.
    #[serde(default)]
    pub raw_inputs: DataMap,
}

impl PipelineDefinition {
    /// Parses a definition from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Serialization`] if the text is not a valid
    /// definition.
    pub fn from_json(text: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a definition from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let definition = Self::from_json(&text)?;

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            path = %path.display(),
            pipes = definition.pipes.len(),
            "Pipeline definition loaded"
        );
        Ok(definition)
    }

    /// Serializes the definition as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Serialization`] if a raw input cannot be
    /// serialized.
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Uses `dir` for every pipe, nested ones included, that enables
    /// autocheckpoint without declaring a directory.
    pub fn with_checkpoint_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        for pipe in &mut self.pipes {
            step::fill_checkpoint_dir(&mut pipe.config, &mut pipe.steps, dir);
        }
        self
    }

    /// Uses `dir` for the run logs of every pipe, nested ones included, that
    /// sets a file log level without declaring a directory.
    pub fn with_log_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        for pipe in &mut self.pipes {
            step::fill_log_dir(&mut pipe.config, &mut pipe.steps, dir);
        }
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if a pipe or step is misconfigured, or the pipeline
    /// declarations are inconsistent.
    pub fn build(&self) -> PipelineResult<Pipeline> {
        self.build_with(&FeatureRegistry::new())
    }

    /// Builds the pipeline, resolving featurize steps against `features`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pipe or step is misconfigured, a featurize step
    /// names an unregistered featurizer, or the pipeline declarations are
    /// inconsistent.
    pub fn build_with(&self, features: &FeatureRegistry) -> PipelineResult<Pipeline> {
        let mut builder = Pipeline::builder().raw_inputs(self.raw_inputs.clone());
        for pipe in &self.pipes {
            let compiled = step::compile_pipe(&pipe.config, &pipe.steps, features)?;
            builder = builder.pipe(compiled, pipe.inputs.clone(), pipe.outputs.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sluice_core::Datum;

    use super::*;

    fn write_source(dir: &Path) -> String {
        let source = dir.join("scents.csv");
        fs::write(
            &source,
            "Name,Price\nrose,12\niris,30\n",
        )
        .unwrap();
        source.to_string_lossy().into_owned()
    }

    fn definition(source: &str) -> String {
        serde_json::json!({
            "pipes": [
                {
                    "name": "Load",
                    "inputs": "source",
                    "outputs": "scents",
                    "steps": [
                        {"type": "extract_csv"},
                        {"type": "header_map", "mapping": {"Name": "name", "Price": "price"}},
                        {"type": "assign_uids", "uid_column": "uid", "prefix": "s"}
                    ]
                },
                {
                    "name": "Discount",
                    "inputs": ["scents"],
                    "outputs": ["discounted"],
                    "uid_column": "uid",
                    "autocompare": true,
                    "autocheckpoint": true,
                    "steps": [
                        {"type": "normalize", "shifts": [{"column": "price", "delta": -2.0}]}
                    ]
                }
            ],
            "raw_inputs": {"source": source}
        })
        .to_string()
    }

    #[test]
    fn test_checkpoint_dir_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let definition = PipelineDefinition::from_json(&definition(&write_source(dir.path()))).unwrap();

        assert!(matches!(
            definition.build(),
            Err(PipelineError::Operator(sluice_core::Error::Configuration(_)))
        ));
    }

    #[test]
    fn test_builds_and_runs() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = dir.path().join("checkpoints");
        let definition = PipelineDefinition::from_json(&definition(&write_source(dir.path())))
            .unwrap()
            .with_checkpoint_dir(&checkpoints);

        let mut pipeline = definition.build().unwrap();
        assert_eq!(pipeline.inferred_final_outputs(), ["discounted"]);

        let outputs = pipeline.run().unwrap();
        let table = outputs.get("discounted").and_then(Datum::as_table).unwrap();

        assert_eq!(table.columns(), ["name", "price", "uid"]);
        assert_eq!(table.cell(0, "price"), Some(&Datum::Float(10.0)));
        assert_eq!(table.cell(1, "uid"), Some(&Datum::from("s1")));
        assert_eq!(fs::read_dir(&checkpoints).unwrap().count(), 1);
    }

    #[test]
    fn test_from_path_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, definition("scents.csv")).unwrap();

        let definition = PipelineDefinition::from_path(&path).unwrap();
        assert_eq!(definition.pipes.len(), 2);
        assert_eq!(definition.pipes[1].config.uid_column.as_deref(), Some("uid"));
        assert_eq!(
            definition.raw_inputs.get("source"),
            Some(&Datum::from("scents.csv"))
        );

        let reparsed = PipelineDefinition::from_json(&definition.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, definition);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PipelineDefinition::from_path(dir.path().join("missing.json")),
            Err(PipelineError::Io { .. })
        ));
    }

    #[test]
    fn test_log_dir_enables_run_logs() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let definition = PipelineDefinition::from_json(
            r#"{
                "pipes": [{
                    "name": "Passing",
                    "inputs": "raw",
                    "outputs": "out",
                    "file_log_level": "info",
                    "steps": [{"type": "pipe", "name": "Inner"}]
                }],
                "raw_inputs": {"raw": 1}
            }"#,
        )
        .unwrap();
        assert!(definition.build().is_err());

        let mut pipeline = definition.with_log_dir(&logs).build().unwrap();
        assert_eq!(pipeline.run().unwrap().get("out"), Some(&Datum::Int(1)));

        let names: Vec<String> = fs::read_dir(&logs)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(" - Passing.txt"));
    }

    #[test]
    fn test_featurize_requires_registry_entry() {
        let definition = PipelineDefinition::from_json(
            r#"{
                "pipes": [{
                    "name": "Featurized",
                    "inputs": "raw",
                    "outputs": "out",
                    "steps": [{"type": "featurize", "feature": "Constant"}]
                }],
                "raw_inputs": {"raw": 1}
            }"#,
        )
        .unwrap();
        assert!(matches!(
            definition.build(),
            Err(PipelineError::InvalidDefinition(_))
        ));

        let mut features = FeatureRegistry::new();
        features.register(crate::operator::Featurizer::new(
            "Constant",
            |table: &sluice_core::Table| {
                Ok(vec![("one".to_owned(), vec![Datum::Int(1); table.num_rows()])])
            },
        ));
        assert!(definition.build_with(&features).is_ok());
    }

    #[test]
    fn test_nested_pipes_receive_checkpoint_dir() {
        let definition = PipelineDefinition::from_json(
            r#"{
                "pipes": [{
                    "name": "Outer",
                    "inputs": "raw",
                    "outputs": "out",
                    "steps": [{"type": "pipe", "name": "Inner", "autocheckpoint": true}]
                }]
            }"#,
        )
        .unwrap()
        .with_checkpoint_dir("/tmp/sluice");

        let StepDefinition::Pipe(inner) = &definition.pipes[0].steps[0] else {
            panic!("expected a nested pipe");
        };
        assert_eq!(
            inner.config.checkpoint_dir.as_deref(),
            Some(Path::new("/tmp/sluice"))
        );
    }
}
