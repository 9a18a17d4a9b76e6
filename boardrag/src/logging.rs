//! Tracing setup shared by the command-line entry points.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Install a global subscriber that writes to stderr and to `log_file`.
///
/// The file is truncated. `RUST_LOG` controls the filter, defaulting to
/// `info`. A second call in the same process leaves the first subscriber in
/// place.
pub fn init(log_file: &Path) -> std::io::Result<()> {
    let file = File::create(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(std::io::stderr.and(Mutex::new(file)))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}
