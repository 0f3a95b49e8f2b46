use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "proxi_tui=info";

/// Sends `tracing` output to `path`. The terminal is in raw mode, so nothing may go to
/// stdout or stderr; when the file cannot be opened logging stays off.
pub fn init(path: &Path) -> bool {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return false;
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .is_ok()
}
