//! Per-run temporary files handed to a script.

use std::{
    io,
    path::{Path, PathBuf},
};

use tempfile::{Builder, TempPath};
use tracing::{info, warn};

/// Unique input, output and supplementary file paths for one run.
///
/// The files are deleted when this is dropped unless `keep` was requested.
#[derive(Debug)]
pub struct TempFiles {
    // input, output, then one per supplementary table
    paths: Vec<TempPath>,
    keep: bool,
}

impl TempFiles {
    pub fn allocate(num_suppl: usize, keep: bool) -> io::Result<Self> {
        let mut paths = Vec::with_capacity(2 + num_suppl);
        paths.push(temp_path("in")?);
        paths.push(temp_path("out")?);
        for i in 0..num_suppl {
            paths.push(temp_path(&format!("suppl{}", i + 1))?);
        }
        Ok(Self { paths, keep })
    }

    pub fn input(&self) -> &Path {
        &self.paths[0]
    }

    pub fn output(&self) -> &Path {
        &self.paths[1]
    }

    pub fn suppl(&self) -> Vec<&Path> {
        self.paths[2..].iter().map(|p| &**p).collect()
    }

    pub fn all(&self) -> Vec<PathBuf> {
        self.paths.iter().map(|p| p.to_path_buf()).collect()
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        if !self.keep {
            return;
        }
        for p in self.paths.drain(..) {
            match p.keep() {
                Ok(path) => info!(path = %path.display(), "kept temporary file"),
                Err(e) => warn!(error = %e, "could not keep temporary file"),
            }
        }
    }
}

fn temp_path(role: &str) -> io::Result<TempPath> {
    Builder::new()
        .prefix(&format!("interop-{}-", role))
        .suffix(".txt")
        .tempfile()
        .map(|f| f.into_temp_path())
}
