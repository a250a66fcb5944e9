//! R family: scripts using the `PerseusR` helper package.

use super::{InterpreterFamily, InterpreterType};

pub static R: InterpreterFamily = InterpreterFamily {
    kind: InterpreterType::R,
    name: "r",
    display_name: "Matrix => R",
    description: "Run R script",
    primary_command: "Rscript",
    probe_args: &["-e", "library(PerseusR)"],
    helper_library: "PerseusR",
    install_dir: "R",
    version_prefix: "R-",
    executable: &["bin", "Rscript"],
    code_filter: "R script, *.R | *.R",
};
