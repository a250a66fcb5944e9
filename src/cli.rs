use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use plugin_interop::InterpreterType;

#[derive(Parser, Debug, Clone)]
#[command(name = "plugin-interop", about = "Run external scripts as matrix processing steps", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a script on a matrix file and write the results.
    Run(RunArgs),
    /// Find a usable interpreter for a family.
    Locate {
        /// Interpreter family (python|r).
        #[arg(long, default_value = "python")]
        family: InterpreterType,
        /// Use this interpreter instead of searching.
        #[arg(long)]
        interpreter: Option<String>,
        /// Print the resolution as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Rewrite a matrix exactly as a script would receive it.
    Preview {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Include the `#!{Type}` annotation row.
        #[arg(long)]
        annotations: bool,
    },
    /// Show how a run would be launched, as JSON, without running it.
    Params(ParamsArgs),
    /// List the built-in interpreter families.
    Families,
}

#[derive(Args, Debug, Clone)]
pub struct ParamsArgs {
    /// Interpreter family (python|r).
    #[arg(long, default_value = "python")]
    pub family: InterpreterType,

    #[arg(long = "code", value_name = "FILE")]
    pub code_file: PathBuf,

    #[arg(long = "args", default_value = "", allow_hyphen_values = true)]
    pub additional_arguments: String,

    #[arg(long)]
    pub interpreter: Option<String>,

    #[arg(long = "suppl-tables", default_value_t = 0)]
    pub suppl_tables: usize,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Interpreter family (python|r).
    #[arg(long, default_value = "python")]
    pub family: InterpreterType,

    /// Script to run.
    #[arg(long = "code", value_name = "FILE")]
    pub code_file: PathBuf,

    /// Extra arguments passed to the script before the file paths.
    #[arg(long = "args", default_value = "", allow_hyphen_values = true)]
    pub additional_arguments: String,

    /// Interpreter executable; searched for when omitted.
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Input matrix file (tab-delimited).
    #[arg(long)]
    pub input: PathBuf,

    /// Where to write the processed matrix.
    #[arg(long)]
    pub output: PathBuf,

    /// Where to write each supplementary table, in order.
    /// Can be used multiple times: --suppl-output a.txt --suppl-output b.txt
    #[arg(long = "suppl-output", action = clap::ArgAction::Append)]
    pub suppl_output: Vec<PathBuf>,

    /// Number of supplementary tables the script produces (defaults to the
    /// number of --suppl-output paths).
    #[arg(long = "suppl-tables")]
    pub suppl_tables: Option<usize>,

    /// Kill the script after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Keep the temporary exchange files for debugging.
    #[arg(long = "keep-temp")]
    pub keep_temp: bool,

    /// Write annotation rows into the output files.
    #[arg(long)]
    pub annotations: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
