use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

use crate::interpreter::InterpreterType;

pub const DEFAULT_PROBE_TIMEOUT_SEC: u64 = 15;
pub const DEFAULT_MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    overlay_env: bool,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .interoprc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, overlay_env: true, config_path }
    }

    /// Defaults plus `pairs`, ignoring the rc file and the environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, overlay_env: false, config_path: default_config_path() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if self.overlay_env {
            if let Ok(v) = env::var(key) {
                return Some(v);
            }
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    /// Explicitly configured interpreter for `family`; empty means discover.
    pub fn interpreter_path(&self, family: InterpreterType) -> String {
        let key = match family {
            InterpreterType::Python => "INTEROP_PYTHON_PATH",
            InterpreterType::R => "INTEROP_R_PATH",
        };
        self.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
    }

    /// Wall-clock limit for one script run; `None` waits indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        self.get_u64("INTEROP_TIMEOUT_SEC")
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(
            self.get_u64("INTEROP_PROBE_TIMEOUT_SEC")
                .unwrap_or(DEFAULT_PROBE_TIMEOUT_SEC),
        )
    }

    pub fn max_diagnostic_bytes(&self) -> usize {
        self.get_usize("INTEROP_MAX_DIAGNOSTIC_BYTES")
            .unwrap_or(DEFAULT_MAX_DIAGNOSTIC_BYTES)
    }

    pub fn keep_temp_files(&self) -> bool {
        self.get_bool("INTEROP_KEEP_TEMP_FILES")
    }

    pub fn log_filter(&self) -> String {
        self.get("INTEROP_LOG")
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "warn".into())
    }
}

fn is_config_key(k: &str) -> bool {
    k.starts_with("INTEROP_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("plugin_interop").join(".interoprc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    // Interpreters: empty triggers discovery
    m.insert("INTEROP_PYTHON_PATH".into(), String::new());
    m.insert("INTEROP_R_PATH".into(), String::new());

    // Numbers
    m.insert("INTEROP_TIMEOUT_SEC".into(), "0".into());
    m.insert(
        "INTEROP_PROBE_TIMEOUT_SEC".into(),
        DEFAULT_PROBE_TIMEOUT_SEC.to_string(),
    );
    m.insert(
        "INTEROP_MAX_DIAGNOSTIC_BYTES".into(),
        DEFAULT_MAX_DIAGNOSTIC_BYTES.to_string(),
    );

    // Bools as strings
    m.insert("INTEROP_KEEP_TEMP_FILES".into(), "false".into());

    m
}
