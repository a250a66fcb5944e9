//! Python family: scripts using the `perseuspy` helper library.

use super::{InterpreterFamily, InterpreterType};

pub static PYTHON: InterpreterFamily = InterpreterFamily {
    kind: InterpreterType::Python,
    name: "python",
    display_name: "Matrix => Python",
    description: "Run Python script",
    primary_command: "python",
    probe_args: &["-c", "import perseuspy"],
    helper_library: "perseuspy",
    install_dir: "Python",
    version_prefix: "Python",
    executable: &["python"],
    code_filter: "Python script, *.py | *.py",
};
