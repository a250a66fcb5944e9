//! Interpreter families: how to find, probe and describe an external runtime.

use std::{fmt, path::PathBuf, str::FromStr};

use serde::Serialize;

mod python;
mod r;

pub use python::PYTHON;
pub use r::R;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpreterType {
    Python,
    R,
}

impl InterpreterType {
    pub const ALL: [InterpreterType; 2] = [InterpreterType::Python, InterpreterType::R];

    pub fn family(self) -> &'static InterpreterFamily {
        match self {
            Self::Python => &PYTHON,
            Self::R => &R,
        }
    }
}

impl fmt::Display for InterpreterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family().name)
    }
}

impl FromStr for InterpreterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "r" | "rscript" => Ok(Self::R),
            other => Err(format!("unknown interpreter family '{}' (expected python or r)", other)),
        }
    }
}

/// Everything that distinguishes one interpreter family from another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpreterFamily {
    pub kind: InterpreterType,
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Bare command tried on the search path first.
    pub primary_command: &'static str,
    /// Arguments that make the interpreter exit 0 only if the helper
    /// library can be loaded.
    pub probe_args: &'static [&'static str],
    /// Helper library the probe checks for.
    pub helper_library: &'static str,
    /// Directory below each installation root holding versioned installs.
    pub install_dir: &'static str,
    /// Versioned install directories start with this prefix.
    pub version_prefix: &'static str,
    /// Executable path inside a versioned install, without platform suffix.
    pub executable: &'static [&'static str],
    /// File dialog filter for code files, `label | pattern`.
    pub code_filter: &'static str,
}

impl InterpreterFamily {
    /// Executable path inside one versioned installation directory.
    pub fn executable_in(&self, install: &std::path::Path) -> PathBuf {
        let mut path = install.to_path_buf();
        if let Some((last, dirs)) = self.executable.split_last() {
            for d in dirs {
                path.push(d);
            }
            path.push(format!("{}{}", last, std::env::consts::EXE_SUFFIX));
        }
        path
    }

    pub fn probe_args(&self) -> Vec<String> {
        self.probe_args.iter().map(|s| s.to_string()).collect()
    }

    /// File extensions accepted by [`Self::code_filter`].
    pub fn code_extensions(&self) -> Vec<&'static str> {
        self.code_filter
            .rsplit('|')
            .next()
            .unwrap_or("")
            .split(';')
            .filter_map(|p| p.trim().strip_prefix("*."))
            .collect()
    }

    pub fn matches_code_file(&self, path: &std::path::Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        self.code_extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }
}
