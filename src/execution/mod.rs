//! Matrix processing step backed by an external script.
//!
//! One call to [`MatrixProcessing::process_data`] walks
//! `Init -> WriteInput -> ResolveExecutable -> Invoke -> ReadOutput -> Done`
//! and launches at most one process. The caller's matrices are replaced only
//! after every output file was read successfully.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    config::Config,
    interpreter::InterpreterFamily,
    locator::{Locator, Probe, ProcessProbe, Resolution},
    matrix::{
        format::{self, MarshalError, DELIMITER},
        Matrix,
    },
    process::{self, Invocation, Outcome, ProcessContext},
};

pub mod args;
pub mod workspace;

pub use args::build_arguments;
pub use workspace::TempFiles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    WriteInput,
    ResolveExecutable,
    Invoke,
    ReadOutput,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "validating parameters",
            Stage::WriteInput => "writing input",
            Stage::ResolveExecutable => "locating interpreter",
            Stage::Invoke => "running script",
            Stage::ReadOutput => "reading output",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Code file '{}' was not found", path.display())]
    CodeFileNotFound { path: PathBuf },

    #[error("Step declares {expected} supplementary tables but {actual} were supplied")]
    SupplTableCount { expected: usize, actual: usize },

    #[error("Could not allocate temporary files: {source}")]
    TempFiles { source: io::Error },

    #[error("Could not write input matrix: {0}")]
    WriteInput(#[source] MarshalError),

    #[error(
        "Could not find a {family} interpreter that can load '{library}'. \
         Install it or configure the interpreter path explicitly."
    )]
    ExecutableNotFound {
        family: &'static str,
        library: &'static str,
    },

    #[error("Script could not be started: {diagnostics}")]
    FailedToStart { diagnostics: String },

    #[error("Script failed with exit code {exit_code}:\n{diagnostics}")]
    ExecutionFailed { exit_code: i32, diagnostics: String },

    #[error("Script was cancelled")]
    Cancelled,

    #[error("Script timed out: {diagnostics}")]
    TimedOut { diagnostics: String },

    #[error("Could not read {table}: {source}")]
    ReadOutput { table: String, source: MarshalError },
}

impl ProcessingError {
    /// Stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::CodeFileNotFound { .. } | Self::SupplTableCount { .. } => Stage::Init,
            Self::TempFiles { .. } | Self::WriteInput(_) => Stage::WriteInput,
            Self::ExecutableNotFound { .. } => Stage::ResolveExecutable,
            Self::FailedToStart { .. }
            | Self::ExecutionFailed { .. }
            | Self::Cancelled
            | Self::TimedOut { .. } => Stage::Invoke,
            Self::ReadOutput { .. } => Stage::ReadOutput,
        }
    }
}

/// User-supplied parameters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parameters {
    /// Interpreter executable; empty triggers discovery.
    pub interpreter: String,
    pub code_file: PathBuf,
    /// Passed to the script between the code file and the input path.
    pub additional_arguments: String,
}

impl Parameters {
    pub fn new(code_file: impl Into<PathBuf>) -> Self {
        Self { code_file: code_file.into(), ..Self::default() }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_additional_arguments(mut self, args: impl Into<String>) -> Self {
        self.additional_arguments = args.into();
        self
    }
}

/// What a run with given parameters would launch, resolved without writing
/// or reading any matrix.
#[derive(Debug, Clone, Serialize)]
pub struct ParametersPreview {
    pub step: &'static str,
    pub family: &'static str,
    pub parameters: Parameters,
    pub code_file_exists: bool,
    /// Whether the code file extension matches the family's code filter.
    pub code_file_matches_filter: bool,
    pub suppl_tables: usize,
    /// `None` when no usable interpreter was found.
    pub interpreter: Option<Resolution>,
    /// Argument vector with placeholders for the temporary files.
    pub arguments: Vec<String>,
}

/// A processing step definition: interpreter family plus declared outputs.
#[derive(Clone)]
pub struct MatrixProcessing {
    family: &'static InterpreterFamily,
    num_suppl_tables: usize,
    probe: Arc<dyn Probe>,
    install_roots: Option<Vec<PathBuf>>,
    keep_temp_files: bool,
}

impl MatrixProcessing {
    pub fn new(family: &'static InterpreterFamily) -> Self {
        Self {
            family,
            num_suppl_tables: 0,
            probe: Arc::new(ProcessProbe::default()),
            install_roots: None,
            keep_temp_files: false,
        }
    }

    pub fn from_config(family: &'static InterpreterFamily, cfg: &Config) -> Self {
        Self {
            probe: Arc::new(ProcessProbe::new(cfg.probe_timeout())),
            keep_temp_files: cfg.keep_temp_files(),
            ..Self::new(family)
        }
    }

    pub fn with_suppl_tables(mut self, count: usize) -> Self {
        self.num_suppl_tables = count;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_install_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.install_roots = Some(roots);
        self
    }

    pub fn keep_temp_files(mut self, keep: bool) -> Self {
        self.keep_temp_files = keep;
        self
    }

    pub fn name(&self) -> &'static str {
        self.family.display_name
    }

    pub fn description(&self) -> &'static str {
        self.family.description
    }

    pub fn family(&self) -> &'static InterpreterFamily {
        self.family
    }

    pub fn num_suppl_tables(&self) -> usize {
        self.num_suppl_tables
    }

    pub fn locator(&self) -> Locator {
        let locator = Locator::new(self.family, self.probe.clone());
        match &self.install_roots {
            Some(roots) => locator.with_roots(roots.clone()),
            None => locator,
        }
    }

    /// Resolves `params` the way [`Self::process_data`] would, without
    /// launching the script. Cancelling `ctx` stops the interpreter search.
    pub async fn preview_parameters(&self, params: &Parameters, ctx: &ProcessContext) -> ParametersPreview {
        let interpreter = self
            .locator()
            .with_cancel(ctx.cancel.clone())
            .resolve(&params.interpreter)
            .await;
        let suppl: Vec<PathBuf> = (1..=self.num_suppl_tables)
            .map(|i| PathBuf::from(format!("<suppl{}>", i)))
            .collect();
        let arguments = build_arguments(
            &params.code_file,
            &params.additional_arguments,
            Path::new("<input>"),
            Path::new("<output>"),
            &suppl,
        );
        ParametersPreview {
            step: self.family.display_name,
            family: self.family.name,
            parameters: params.clone(),
            code_file_exists: params.code_file.is_file(),
            code_file_matches_filter: self.family.matches_code_file(&params.code_file),
            suppl_tables: self.num_suppl_tables,
            interpreter,
            arguments,
        }
    }

    /// Runs the script on `mdata`.
    ///
    /// An empty `suppl_tables` is filled with one fresh matrix per declared
    /// table; a non-empty one must match the declared count. On error neither
    /// `mdata` nor `suppl_tables` is modified.
    pub async fn process_data(
        &self,
        mdata: &mut Matrix,
        params: &Parameters,
        suppl_tables: &mut Vec<Matrix>,
        ctx: &ProcessContext,
    ) -> Result<(), ProcessingError> {
        let span = info_span!("process_data", step = self.family.display_name);
        let result = self
            .run_stages(mdata, params, suppl_tables, ctx)
            .instrument(span)
            .await;
        if let Err(e) = &result {
            warn!(stage = ?e.stage(), error = %e, "processing failed");
        }
        result
    }

    async fn run_stages(
        &self,
        mdata: &mut Matrix,
        params: &Parameters,
        suppl_tables: &mut Vec<Matrix>,
        ctx: &ProcessContext,
    ) -> Result<(), ProcessingError> {
        ctx.set_status(&Stage::Init.to_string());
        let code_file = check_code_file(&params.code_file)?;
        if !self.family.matches_code_file(code_file) {
            warn!(
                code_file = %code_file.display(),
                filter = self.family.code_filter,
                "code file does not match the family's code filter"
            );
        }
        let expected = self.num_suppl_tables;
        if !suppl_tables.is_empty() && suppl_tables.len() != expected {
            return Err(ProcessingError::SupplTableCount { expected, actual: suppl_tables.len() });
        }

        ctx.set_status(&Stage::WriteInput.to_string());
        let files = TempFiles::allocate(expected, self.keep_temp_files)
            .map_err(|source| ProcessingError::TempFiles { source })?;
        format::write(mdata, files.input(), false).map_err(ProcessingError::WriteInput)?;
        debug!(input = %files.input().display(), shape = %mdata, "wrote input matrix");

        ctx.set_status(&Stage::ResolveExecutable.to_string());
        let resolution = self
            .locator()
            .with_cancel(ctx.cancel.clone())
            .resolve(&params.interpreter)
            .await;
        if ctx.cancel.is_cancelled() {
            return Err(ProcessingError::Cancelled);
        }
        let resolution = resolution.ok_or(ProcessingError::ExecutableNotFound {
            family: self.family.name,
            library: self.family.helper_library,
        })?;
        ctx.set_status(&Stage::Invoke.to_string());
        let args = build_arguments(
            code_file,
            &params.additional_arguments,
            files.input(),
            files.output(),
            &files.suppl(),
        );
        let invocation = Invocation::new(resolution.path, args);
        let result = process::run(&invocation, ctx).await;
        match result.outcome {
            Outcome::Cancelled => return Err(ProcessingError::Cancelled),
            Outcome::TimedOut => {
                return Err(ProcessingError::TimedOut { diagnostics: result.error_text })
            }
            Outcome::FailedToStart => {
                return Err(ProcessingError::FailedToStart { diagnostics: result.error_text })
            }
            Outcome::Exited if !result.success() => {
                return Err(ProcessingError::ExecutionFailed {
                    exit_code: result.exit_code,
                    diagnostics: result.error_text,
                })
            }
            Outcome::Exited => {}
        }

        ctx.set_status(&Stage::ReadOutput.to_string());
        let mut output = Matrix::new();
        format::read(&mut output, files.output(), DELIMITER).map_err(|source| {
            ProcessingError::ReadOutput { table: "output matrix".into(), source }
        })?;
        let mut suppl = Vec::with_capacity(expected);
        for (i, path) in files.suppl().into_iter().enumerate() {
            let mut table = Matrix::new();
            format::read(&mut table, path, DELIMITER).map_err(|source| {
                ProcessingError::ReadOutput {
                    table: format!("supplementary table {}", i + 1),
                    source,
                }
            })?;
            suppl.push(table);
        }

        *mdata = output;
        *suppl_tables = suppl;
        info!(shape = %mdata, suppl_tables = suppl_tables.len(), "processing finished");
        ctx.set_status(&Stage::Done.to_string());
        Ok(())
    }
}

fn check_code_file(path: &Path) -> Result<&Path, ProcessingError> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(ProcessingError::CodeFileNotFound { path: path.to_path_buf() });
    }
    Ok(path)
}
