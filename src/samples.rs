use std::path::{Path, PathBuf};

/// Global samples directory (~/.kitsynth/samples/)
pub fn samples_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".kitsynth").join("samples")
}

/// Default search directories: project-local ./samples first, then the global one
pub fn search_dirs() -> Vec<PathBuf> {
    [PathBuf::from("./samples"), samples_dir()]
        .into_iter()
        .filter(|dir| dir.is_dir())
        .collect()
}

/// Resolve a sample name to a file. Existing paths (absolute or relative to
/// the working directory) win, then each search directory in order.
pub fn resolve_sample_path(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let as_path = Path::new(name);
    if as_path.is_file() {
        return Some(as_path.to_path_buf());
    }
    if as_path.is_absolute() {
        return None;
    }
    dirs.iter().map(|dir| dir.join(name)).find(|full| full.is_file())
}
