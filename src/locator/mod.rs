//! Interpreter discovery: explicit override, search path, installation roots.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::interpreter::InterpreterFamily;

mod probe;

pub use probe::{Probe, ProcessProbe};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "root", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Configured by the user; trusted without probing.
    Explicit,
    /// Bare command found on the search path.
    SearchPath,
    /// Versioned install below this installation root.
    InstallRoot(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub path: PathBuf,
    /// True only when a capability probe exited 0.
    pub verified: bool,
    pub source: ResolutionSource,
}

/// Finds a usable interpreter for one family.
///
/// Every call to [`Locator::resolve`] probes afresh; callers that want to
/// reuse a result pass it back in as the explicit path.
#[derive(Clone)]
pub struct Locator {
    family: &'static InterpreterFamily,
    roots: Vec<PathBuf>,
    probe: Arc<dyn Probe>,
    cancel: CancellationToken,
}

impl Locator {
    pub fn new(family: &'static InterpreterFamily, probe: Arc<dyn Probe>) -> Self {
        Self { family, roots: install_roots(family), probe, cancel: CancellationToken::new() }
    }

    /// Aborts a running scan, killing the candidate being probed.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replaces the installation roots scanned after the search path.
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    pub fn family(&self) -> &'static InterpreterFamily {
        self.family
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Returns `None` when nothing usable was found or the scan was cancelled.
    pub async fn resolve(&self, explicit: &str) -> Option<Resolution> {
        let explicit = explicit.trim();
        if !explicit.is_empty() {
            debug!(path = explicit, "using configured interpreter");
            return Some(Resolution {
                path: PathBuf::from(explicit),
                verified: false,
                source: ResolutionSource::Explicit,
            });
        }

        let args = self.family.probe_args();
        let primary = PathBuf::from(self.family.primary_command);
        if self.check(&primary, &args).await? {
            info!(family = self.family.name, "found '{}' in PATH", primary.display());
            return Some(Resolution {
                path: primary,
                verified: true,
                source: ResolutionSource::SearchPath,
            });
        }

        for root in &self.roots {
            for install in versioned_installs(root, self.family.version_prefix) {
                let candidate = self.family.executable_in(&install);
                if self.check(&candidate, &args).await? {
                    info!(
                        family = self.family.name,
                        path = %candidate.display(),
                        "found interpreter in default installation folder"
                    );
                    return Some(Resolution {
                        path: candidate,
                        verified: true,
                        source: ResolutionSource::InstallRoot(root.clone()),
                    });
                }
            }
        }

        info!(family = self.family.name, "no usable interpreter found");
        None
    }

    // `None` once cancelled; dropping the probe kills its child.
    async fn check(&self, candidate: &Path, args: &[String]) -> Option<bool> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(family = self.family.name, "interpreter search cancelled");
                None
            }
            usable = self.probe.probe(candidate, args) => Some(usable),
        }
    }
}

/// Platform installation roots for `family`, in search order.
///
/// Program files roots come from the environment and are skipped when unset;
/// the per-user root is `<local data dir>/Programs`.
pub fn install_roots(family: &InterpreterFamily) -> Vec<PathBuf> {
    let mut bases: Vec<PathBuf> = ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|var| env::var_os(var))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .collect();
    if let Some(dirs) = directories::BaseDirs::new() {
        bases.push(dirs.data_local_dir().join("Programs"));
    }
    let mut roots: Vec<PathBuf> = Vec::new();
    for base in bases {
        let root = base.join(family.install_dir);
        if !roots.contains(&root) {
            roots.push(root);
        }
    }
    roots
}

/// Subdirectories of `root` whose name starts with `prefix`, sorted by name.
///
/// A missing or unreadable root yields nothing.
pub fn versioned_installs(root: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        debug!(root = %root.display(), "installation root not readable");
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| e.file_name().to_string_lossy().starts_with(prefix))
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}
