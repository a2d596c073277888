use leadflow_core::config::DATA_DIR;
use std::path::{Path, PathBuf};

/// Resolve the leadflow data root.
///
/// Priority:
/// 1. `--data-dir` flag / `LEADFLOW_HOME` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.leadflow/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut dir = cwd.clone();
    loop {
        if dir.join(DATA_DIR).is_dir() {
            return dir;
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => break,
        }
    }

    cwd
}
