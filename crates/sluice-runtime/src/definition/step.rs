//! Serializable step definitions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sluice_core::{Error, Operator, OperatorExt, Table};

use crate::error::{PipelineError, PipelineResult};
use crate::operator::{
    AssignUids, Checkpoint, CheckpointOptions, ColumnShift, Compare, Concat, CsvExtractor,
    CsvOptions, DEFAULT_SUFFIXES, FeatureRegistry, HeaderMap, JoinKind, JsonExtractor,
    JsonOptions, Merge, Normalizer,
};
use crate::pipe::{Pipe, PipeConfig};

/// One step of a pipe, tagged by `type`.
///
/// ```json
/// {"type": "extract_csv", "delimiter": ";"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDefinition {
    /// Reads a delimited-text file into a table.
    ExtractCsv(CsvOptions),
    /// Reads JSON records into a table.
    ExtractJson(JsonOptions),
    /// Renames columns.
    HeaderMap(HeaderMapStep),
    /// Shifts numeric columns.
    Normalize(NormalizeStep),
    /// Assigns unique row ids.
    AssignUids(AssignUidsStep),
    /// Stacks tables row-wise.
    Concat,
    /// Writes the table to a file.
    Checkpoint(CheckpointStep),
    /// Compares the table against a reference file.
    Compare(CompareStep),
    /// Appends columns computed by a registered featurizer.
    Featurize(FeaturizeStep),
    /// Joins the table with a delimited-text file.
    Merge(MergeStep),
    /// A nested pipe.
    Pipe(NestedPipe),
}

/// Options of a [`StepDefinition::HeaderMap`] step.
///
/// The mapping is given inline or loaded from a JSON file, not both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMapStep {
    /// Old to new column names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: BTreeMap<String, String>,
    /// JSON file holding the mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Whether every column must be mapped.
    #[serde(default = "complete_by_default")]
    pub complete: bool,
}

fn complete_by_default() -> bool {
    true
}

/// Options of a [`StepDefinition::Normalize`] step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeStep {
    /// Deltas per column.
    pub shifts: Vec<ColumnShift>,
}

/// Options of a [`StepDefinition::AssignUids`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignUidsStep {
    /// Column receiving the uids.
    pub uid_column: String,
    /// Uid prefix; a fresh UUID when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// First number handed out.
    #[serde(default)]
    pub start: u64,
}

/// Options of a [`StepDefinition::Checkpoint`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointStep {
    /// Target file.
    pub path: PathBuf,
    /// Formatting options.
    #[serde(flatten)]
    pub options: CheckpointOptions,
}

/// Options of a [`StepDefinition::Compare`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareStep {
    /// Delimited-text file holding the reference table.
    pub reference: PathBuf,
    /// Column identifying rows.
    pub uid_column: String,
    /// Columns excluded from cell comparison.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    /// How to parse the reference file.
    #[serde(default)]
    pub csv: CsvOptions,
}

/// Options of a [`StepDefinition::Featurize`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturizeStep {
    /// Name the featurizer is registered under.
    pub feature: String,
}

/// Options of a [`StepDefinition::Merge`] step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStep {
    /// Delimited-text file holding the right table.
    pub right: PathBuf,
    /// Key columns.
    pub on: Vec<String>,
    /// Which rows are kept.
    #[serde(default)]
    pub how: JoinKind,
    /// Suffixes of overlapping non-key columns.
    #[serde(default = "default_suffixes")]
    pub suffixes: (String, String),
    /// How to parse the right file.
    #[serde(default)]
    pub csv: CsvOptions,
}

fn default_suffixes() -> (String, String) {
    (DEFAULT_SUFFIXES.0.to_owned(), DEFAULT_SUFFIXES.1.to_owned())
}

/// A pipe nested as a step of another pipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedPipe {
    /// Pipe options.
    #[serde(flatten)]
    pub config: PipeConfig,
    /// Steps in application order.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

impl NestedPipe {
    /// Builds the pipe.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipe configuration or a step is invalid.
    pub fn compile(&self) -> PipelineResult<Pipe> {
        self.compile_with(&FeatureRegistry::new())
    }

    /// Builds the pipe, resolving featurize steps against `features`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipe configuration or a step is invalid.
    pub fn compile_with(&self, features: &FeatureRegistry) -> PipelineResult<Pipe> {
        compile_pipe(&self.config, &self.steps, features)
    }
}

/// Builds a pipe from its configuration and step definitions.
pub(super) fn compile_pipe(
    config: &PipeConfig,
    steps: &[StepDefinition],
    features: &FeatureRegistry,
) -> PipelineResult<Pipe> {
    let steps = steps
        .iter()
        .map(|step| step.compile_with(features))
        .collect::<PipelineResult<Vec<_>>>()?;
    Ok(Pipe::with_config(config.clone(), steps)?)
}

/// Calls `f` on `config` and on the configuration of every nested pipe.
pub(super) fn for_each_config(
    config: &mut PipeConfig,
    steps: &mut [StepDefinition],
    f: &mut dyn FnMut(&mut PipeConfig),
) {
    f(config);
    for step in steps {
        if let StepDefinition::Pipe(nested) = step {
            for_each_config(&mut nested.config, &mut nested.steps, f);
        }
    }
}

/// Sets `dir` on every pipe that enables autocheckpoint without a directory.
pub(super) fn fill_checkpoint_dir(config: &mut PipeConfig, steps: &mut [StepDefinition], dir: &Path) {
    for_each_config(config, steps, &mut |config: &mut PipeConfig| {
        if config.autocheckpoint && config.checkpoint_dir.is_none() {
            config.checkpoint_dir = Some(dir.to_path_buf());
        }
    });
}

/// Sets `dir` on every pipe that sets a file log level without a directory.
pub(super) fn fill_log_dir(config: &mut PipeConfig, steps: &mut [StepDefinition], dir: &Path) {
    for_each_config(config, steps, &mut |config: &mut PipeConfig| {
        if config.file_log_level.is_some() && config.log_dir.is_none() {
            config.log_dir = Some(dir.to_path_buf());
        }
    });
}

impl StepDefinition {
    /// Builds the operator this step describes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDefinition`] for inconsistent options,
    /// or the error raised while loading a file the step refers to.
    pub fn compile(&self) -> PipelineResult<Box<dyn Operator>> {
        self.compile_with(&FeatureRegistry::new())
    }

    /// Builds the operator, resolving featurize steps against `features`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDefinition`] for inconsistent options
    /// or an unregistered feature, or the error raised while loading a file
    /// the step refers to.
    pub fn compile_with(&self, features: &FeatureRegistry) -> PipelineResult<Box<dyn Operator>> {
        let operator = match self {
            Self::ExtractCsv(options) => CsvExtractor::with_options(options.clone()).boxed(),
            Self::ExtractJson(options) => JsonExtractor::with_options(options.clone()).boxed(),
            Self::HeaderMap(step) => step.compile()?.boxed(),
            Self::Normalize(step) => Normalizer::new(step.shifts.clone()).boxed(),
            Self::AssignUids(step) => {
                let mut operator = AssignUids::new(step.uid_column.clone()).starting_at(step.start);
                if let Some(prefix) = &step.prefix {
                    operator = operator.with_prefix(prefix.clone());
                }
                operator.boxed()
            }
            Self::Concat => Concat.boxed(),
            Self::Checkpoint(step) => {
                Checkpoint::with_options(step.path.clone(), step.options.clone()).boxed()
            }
            Self::Compare(step) => step.compile()?.boxed(),
            Self::Featurize(step) => features
                .get(&step.feature)
                .cloned()
                .ok_or_else(|| {
                    PipelineError::InvalidDefinition(format!(
                        "no featurizer registered as {:?}",
                        step.feature
                    ))
                })?
                .boxed(),
            Self::Merge(step) => step.compile()?.boxed(),
            Self::Pipe(nested) => nested.compile_with(features)?.boxed(),
        };
        Ok(operator)
    }
}

impl HeaderMapStep {
    fn compile(&self) -> PipelineResult<HeaderMap> {
        let map = match (&self.path, self.mapping.is_empty()) {
            (Some(_), false) => {
                return Err(PipelineError::InvalidDefinition(
                    "header_map takes either a mapping or a path, not both".into(),
                ));
            }
            (Some(path), true) => HeaderMap::from_path(path)?,
            (None, _) => HeaderMap::new(self.mapping.clone()),
        };
        Ok(map.complete(self.complete))
    }
}

/// Loads a delimited-text file a step refers to.
fn read_table(path: &Path, options: &CsvOptions) -> PipelineResult<Table> {
    let text = std::fs::read_to_string(path).map_err(|error| Error::io(path, error))?;
    Ok(CsvExtractor::with_options(options.clone()).parse(&text)?)
}

impl CompareStep {
    fn compile(&self) -> PipelineResult<Compare> {
        let reference = read_table(&self.reference, &self.csv)?;
        Ok(Compare::new(reference, self.uid_column.clone()).ignore(self.ignore.iter().cloned()))
    }
}

impl MergeStep {
    fn compile(&self) -> PipelineResult<Merge> {
        if self.on.is_empty() {
            return Err(PipelineError::InvalidDefinition(
                "merge requires at least one key column".into(),
            ));
        }
        let right = read_table(&self.right, &self.csv)?;
        Ok(Merge::new(right, self.on.iter().cloned())
            .how(self.how)
            .suffixes(self.suffixes.0.clone(), self.suffixes.1.clone()))
    }
}
