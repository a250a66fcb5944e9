//! Run external interpreter scripts as matrix processing steps.
//!
//! A step writes its input [`Matrix`] to a temporary tab-delimited file,
//! locates an interpreter, launches it on a user script with positional file
//! arguments, and reads the script's output files back.

pub mod config;
pub mod execution;
pub mod interpreter;
pub mod locator;
pub mod matrix;
pub mod process;

pub use execution::{MatrixProcessing, Parameters, ParametersPreview, ProcessingError, Stage};
pub use interpreter::{InterpreterFamily, InterpreterType};
pub use matrix::{Column, ColumnKind, Matrix};
pub use process::{ProcessContext, StatusSink};
