use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// `KEY=VALUE` file read from the working directory.
pub const DEFAULT_ENV_FILE: &str = "config.env";

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, the
/// value is everything after the first `=`.
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Read an env file. A missing file yields no variables.
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let vars = parse_env_file(&contents);
            debug!(?path, count = vars.len(), "Loaded env file");
            Ok(vars)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read env file {path:?}")),
    }
}

/// Variable lookup where values from `config.env` in the working directory
/// override the process environment.
pub fn env_lookup() -> impl Fn(&str) -> Option<String> {
    let file_vars = load_env_file(Path::new(DEFAULT_ENV_FILE)).unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "Ignoring unreadable env file");
        HashMap::new()
    });
    layered_lookup(file_vars, |name| std::env::var(name).ok())
}

/// `file_vars` first, `fallback` second.
pub fn layered_lookup(
    file_vars: HashMap<String, String>,
    fallback: impl Fn(&str) -> Option<String>,
) -> impl Fn(&str) -> Option<String> {
    move |name| file_vars.get(name).cloned().or_else(|| fallback(name))
}
