#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use plugin_interop::{
    locator::{Probe, ProcessProbe},
    Column, ColumnKind, Matrix,
};

pub fn sample_matrix() -> Matrix {
    Matrix::from_columns(vec![
        Column::numeric("Intensity A", ColumnKind::Main, vec![10.5, 20.25, 0.125]),
        Column::numeric("Intensity B", ColumnKind::Main, vec![11.0, -3.5, 7.0]),
        Column::text(
            "Protein IDs",
            ColumnKind::Text,
            vec!["P0001".into(), "P0002;P0003".into(), "Q9".into()],
        ),
    ])
    .unwrap()
}

/// Writes a `/bin/sh` script into `dir` and returns its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

/// Writes an executable file into `dir`.
#[cfg(unix)]
pub fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = write_script(dir, name, body);
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Counts probes and rejects every candidate.
#[derive(Default)]
pub struct CountingProbe {
    pub calls: AtomicUsize,
}

impl CountingProbe {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for CountingProbe {
    async fn probe(&self, _candidate: &Path, _args: &[String]) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        false
    }
}

/// Rejects the bare search-path command and really runs everything else.
pub struct InstallOnlyProbe {
    pub primary: &'static str,
    pub inner: ProcessProbe,
    pub seen: Mutex<Vec<PathBuf>>,
}

impl InstallOnlyProbe {
    pub fn new(primary: &'static str) -> Arc<Self> {
        Arc::new(Self { primary, inner: ProcessProbe::default(), seen: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl Probe for InstallOnlyProbe {
    async fn probe(&self, candidate: &Path, args: &[String]) -> bool {
        self.seen.lock().unwrap().push(candidate.to_path_buf());
        if candidate == Path::new(self.primary) {
            return false;
        }
        self.inner.probe(candidate, args).await
    }
}

/// Collects status updates.
pub fn recording_sink() -> (Arc<Mutex<Vec<String>>>, Arc<dyn plugin_interop::StatusSink>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sink: Arc<dyn plugin_interop::StatusSink> =
        Arc::new(move |s: &str| sink.lock().unwrap().push(s.to_string()));
    (seen, sink)
}
